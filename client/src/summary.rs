//! Display-ready per-proposal figures.

use crate::names::AddressBook;
use crate::quorum::QuorumProgress;
use crate::result::{resolve_proposal, resolve_sub_item};
use crate::storage::KeyValueStore;
use crate::time::{has_expired_at, remaining_time_at};
use crate::types::{Proposal, ProposalId, VoteResult};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one sub-item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubItemSummary {
    /// Sub-item id
    pub id: String,
    /// Sub-item title
    pub title: String,
    /// Progress towards quorum
    pub quorum: QuorumProgress,
    /// Outcome of the sub-item vote
    pub result: VoteResult,
}

/// Everything a proposal card or detail page shows besides the raw record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalSummary {
    /// Proposal id
    pub id: ProposalId,
    /// Author display name
    pub author_name: String,
    /// Progress towards quorum
    pub quorum: QuorumProgress,
    /// Share of `for` votes among all cast votes, 0 with no votes
    pub for_percentage: f64,
    /// `"{h}h {m}m"` or the expired label
    pub remaining_time: String,
    /// Whether the deadline has passed
    pub expired: bool,
    /// Outcome of the main vote
    pub result: VoteResult,
    /// Outcome of each sub-item, empty unless multilayered
    pub sub_items: Vec<SubItemSummary>,
}

impl ProposalSummary {
    /// Derive a summary at the current time
    pub fn derive<S: KeyValueStore>(
        proposal: &Proposal,
        registered_voters: u64,
        names: &AddressBook<S>,
    ) -> Self {
        Self::derive_at(proposal, registered_voters, names, Utc::now())
    }

    /// Derive a summary as of `now`
    pub fn derive_at<S: KeyValueStore>(
        proposal: &Proposal,
        registered_voters: u64,
        names: &AddressBook<S>,
        now: DateTime<Utc>,
    ) -> Self {
        let tally = proposal.tally();
        let total = tally.total();
        let for_percentage = if total == 0 {
            0.0
        } else {
            tally.votes_for as f64 / total as f64 * 100.0
        };

        let sub_items = proposal
            .sub_items()
            .iter()
            .map(|item| SubItemSummary {
                id: item.id.clone(),
                title: item.title.clone(),
                quorum: QuorumProgress::of(&item.tally(), registered_voters),
                result: resolve_sub_item(item, registered_voters),
            })
            .collect();

        Self {
            id: proposal.id,
            author_name: names.resolve_name(&proposal.author),
            quorum: QuorumProgress::of(&tally, registered_voters),
            for_percentage,
            remaining_time: remaining_time_at(proposal.closes_at, now),
            expired: has_expired_at(proposal.closes_at, now),
            result: resolve_proposal(proposal, registered_voters),
            sub_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::time::EXPIRED_LABEL;
    use crate::types::{ProposalStatus, ProposalSubItem, VoteOption};
    use alloy_primitives::U256;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn proposal(votes_for: u64, votes_against: u64, votes_abstain: u64) -> Proposal {
        Proposal {
            id: U256::from(7u64),
            title: "Statut".to_string(),
            description: String::new(),
            author: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string(),
            date_added: now() - Duration::days(1),
            closes_at: now() + Duration::hours(5) + Duration::minutes(30),
            votes_for,
            votes_against,
            votes_abstain,
            status: ProposalStatus::Open,
            your_vote: VoteOption::DidntVote,
            votes_for_address: BTreeMap::new(),
            is_multilayered: false,
            sub_items: Vec::new(),
            can_be_canceled: Some(true),
        }
    }

    fn book() -> AddressBook<MemoryStore> {
        AddressBook::with_default_names(MemoryStore::new())
    }

    #[test]
    fn test_passed_with_quorum() {
        let summary = ProposalSummary::derive_at(&proposal(3, 1, 0), 7, &book(), now());

        assert_eq!(summary.author_name, "Fakultet 1");
        assert_eq!(summary.quorum.quorum, 4);
        assert!(summary.quorum.reached);
        assert_eq!(summary.quorum.percentage, 100.0);
        assert_eq!(summary.for_percentage, 75.0);
        assert_eq!(summary.remaining_time, "5h 30m");
        assert!(!summary.expired);
        assert_eq!(summary.result, VoteResult::Passed);
        assert!(summary.sub_items.is_empty());
    }

    #[test]
    fn test_no_votes() {
        let summary = ProposalSummary::derive_at(&proposal(0, 0, 0), 7, &book(), now());
        assert_eq!(summary.for_percentage, 0.0);
        assert_eq!(summary.quorum.remaining, 4);
        assert_eq!(summary.result, VoteResult::Returned);
    }

    #[test]
    fn test_expired() {
        let p = proposal(1, 1, 0);
        let later = p.closes_at + Duration::seconds(1);
        let summary = ProposalSummary::derive_at(&p, 2, &book(), later);
        assert!(summary.expired);
        assert_eq!(summary.remaining_time, EXPIRED_LABEL);
        assert_eq!(summary.result, VoteResult::Failed);
    }

    #[test]
    fn test_sub_item_results() {
        let mut p = proposal(4, 0, 0);
        let mut first = ProposalSubItem::new("1", "Plate", "");
        first.votes_for = 4;
        let mut second = ProposalSubItem::new("2", "Oprema", "");
        second.votes_for = 2;
        second.votes_against = 2;
        let third = ProposalSubItem::new("3", "Putovanja", "");
        p.is_multilayered = true;
        p.sub_items = vec![first, second, third];

        let summary = ProposalSummary::derive_at(&p, 7, &book(), now());
        let results: Vec<VoteResult> = summary.sub_items.iter().map(|s| s.result).collect();
        assert_eq!(
            results,
            vec![VoteResult::Passed, VoteResult::Failed, VoteResult::Returned]
        );
        assert_eq!(summary.sub_items[0].title, "Plate");
    }
}
