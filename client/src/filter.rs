//! Search and date-window filtering for the results page.

use crate::error::EvsdError;
use crate::types::Proposal;
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How far back closed proposals are listed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateWindow {
    /// No limit
    #[default]
    All,
    /// Last calendar month
    Month,
    /// Last three calendar months
    Quarter,
    /// Last twelve calendar months
    Year,
}

impl DateWindow {
    /// Calendar months covered, `None` for no limit
    pub fn months(&self) -> Option<u32> {
        match self {
            DateWindow::All => None,
            DateWindow::Month => Some(1),
            DateWindow::Quarter => Some(3),
            DateWindow::Year => Some(12),
        }
    }

    /// Earliest `closes_at` still inside the window, exclusive
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.months()
            .and_then(|months| now.checked_sub_months(Months::new(months)))
    }
}

impl FromStr for DateWindow {
    type Err = EvsdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(DateWindow::All),
            "month" => Ok(DateWindow::Month),
            "quarter" => Ok(DateWindow::Quarter),
            "year" => Ok(DateWindow::Year),
            other => Err(EvsdError::ConfigError(format!(
                "Unknown date window: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DateWindow::All => "all",
            DateWindow::Month => "month",
            DateWindow::Quarter => "quarter",
            DateWindow::Year => "year",
        };
        f.write_str(name)
    }
}

/// Results-page filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsFilter {
    /// Case-insensitive substring; empty matches everything
    pub search: String,
    /// Date window on `closes_at`
    pub window: DateWindow,
}

impl ResultsFilter {
    /// Filter matching everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by search text
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Filter by date window
    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    /// Whether `proposal` passes at `now`.
    ///
    /// `author_name` resolves the proposer address to a display name; the
    /// search matches the title, the description, that name or the raw
    /// address.
    pub fn matches_at<F>(&self, proposal: &Proposal, author_name: F, now: DateTime<Utc>) -> bool
    where
        F: Fn(&str) -> String,
    {
        if let Some(cutoff) = self.window.cutoff(now) {
            if proposal.closes_at <= cutoff {
                return false;
            }
        }

        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        [
            proposal.title.as_str(),
            proposal.description.as_str(),
            proposal.author.as_str(),
            author_name(&proposal.author).as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Matching proposals at `now`, in input order
    pub fn apply_at<'a, F>(
        &self,
        proposals: &'a [Proposal],
        author_name: F,
        now: DateTime<Utc>,
    ) -> Vec<&'a Proposal>
    where
        F: Fn(&str) -> String,
    {
        proposals
            .iter()
            .filter(|p| self.matches_at(p, &author_name, now))
            .collect()
    }

    /// [`ResultsFilter::apply_at`] at the current time
    pub fn apply<'a, F>(&self, proposals: &'a [Proposal], author_name: F) -> Vec<&'a Proposal>
    where
        F: Fn(&str) -> String,
    {
        self.apply_at(proposals, author_name, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProposalStatus, VoteOption};
    use alloy_primitives::U256;
    use assert_matches::assert_matches;
    use chrono::Duration;
    use std::collections::BTreeMap;
    use test_case::test_case;

    const AUTHOR: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_717_200_000, 0).unwrap()
    }

    fn proposal(id: u64, title: &str, closed_days_ago: i64) -> Proposal {
        Proposal {
            id: U256::from(id),
            title: title.to_string(),
            description: "Opis predloga".to_string(),
            author: AUTHOR.to_string(),
            date_added: now() - Duration::days(closed_days_ago + 7),
            closes_at: now() - Duration::days(closed_days_ago),
            votes_for: 0,
            votes_against: 0,
            votes_abstain: 0,
            status: ProposalStatus::Closed,
            your_vote: VoteOption::DidntVote,
            votes_for_address: BTreeMap::new(),
            is_multilayered: false,
            sub_items: Vec::new(),
            can_be_canceled: None,
        }
    }

    fn names(address: &str) -> String {
        if address == AUTHOR {
            "Fakultet 1".to_string()
        } else {
            address.to_string()
        }
    }

    fn titles(found: Vec<&Proposal>) -> Vec<String> {
        found.into_iter().map(|p| p.title.clone()).collect()
    }

    #[test_case(DateWindow::All, 4 ; "all")]
    #[test_case(DateWindow::Month, 1 ; "month")]
    #[test_case(DateWindow::Quarter, 2 ; "quarter")]
    #[test_case(DateWindow::Year, 3 ; "year")]
    fn test_window(window: DateWindow, expected: usize) {
        let proposals = vec![
            proposal(1, "a", 10),
            proposal(2, "b", 60),
            proposal(3, "c", 200),
            proposal(4, "d", 800),
        ];
        let filter = ResultsFilter::new().with_window(window);
        assert_eq!(filter.apply_at(&proposals, names, now()).len(), expected);
    }

    #[test]
    fn test_window_cutoff_is_exclusive() {
        let cutoff = DateWindow::Month.cutoff(now()).unwrap();
        let mut p = proposal(1, "a", 0);
        p.closes_at = cutoff;

        let filter = ResultsFilter::new().with_window(DateWindow::Month);
        assert!(!filter.matches_at(&p, names, now()));

        p.closes_at = cutoff + Duration::seconds(1);
        assert!(filter.matches_at(&p, names, now()));
    }

    #[test]
    fn test_search_fields() {
        let proposals = vec![proposal(1, "Budžet", 1), proposal(2, "Statut", 1)];

        let by_title = ResultsFilter::new().with_search("budž");
        assert_eq!(titles(by_title.apply_at(&proposals, names, now())), vec!["Budžet"]);

        let by_name = ResultsFilter::new().with_search("fakultet 1");
        assert_eq!(by_name.apply_at(&proposals, names, now()).len(), 2);

        let by_address = ResultsFilter::new().with_search("0x7099");
        assert_eq!(by_address.apply_at(&proposals, names, now()).len(), 2);

        let by_description = ResultsFilter::new().with_search("OPIS");
        assert_eq!(by_description.apply_at(&proposals, names, now()).len(), 2);

        let none = ResultsFilter::new().with_search("rektor");
        assert!(none.apply_at(&proposals, names, now()).is_empty());
    }

    #[test]
    fn test_search_and_window_combine() {
        let proposals = vec![proposal(1, "Statut", 10), proposal(2, "Statut", 400)];
        let filter = ResultsFilter::new()
            .with_search("statut")
            .with_window(DateWindow::Year);
        let found = filter.apply_at(&proposals, names, now());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, U256::from(1u64));
    }

    #[test]
    fn test_parse_window() {
        assert_eq!("quarter".parse::<DateWindow>().unwrap(), DateWindow::Quarter);
        assert_eq!("YEAR".parse::<DateWindow>().unwrap(), DateWindow::Year);
        assert_matches!("week".parse::<DateWindow>(), Err(EvsdError::ConfigError(_)));
        assert_eq!(DateWindow::Month.to_string(), "month");
    }
}
