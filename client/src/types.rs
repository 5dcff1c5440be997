//! Common types shared across the view-model layer.
//!
//! A [`Proposal`] is a read-only projection of governor state plus the
//! per-session fields the front-end attaches to it (`your_vote`,
//! `votes_for_address`). It is rebuilt from the event log on every refresh.

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Unbounded on-chain proposal identifier
pub type ProposalId = U256;

/// Wallet address as rendered by the contract layer (`0x`-prefixed hex)
pub type Address = String;

/// A wallet's vote state on a single votable item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoteOption {
    /// Voted for
    For,
    /// Voted against
    Against,
    /// Abstained (counts toward quorum only)
    Abstain,
    /// Registered voter without a recorded vote
    DidntVote,
    /// Not a registered voter
    NotEligible,
}

impl VoteOption {
    /// True for options that correspond to a cast ballot
    pub fn is_cast(&self) -> bool {
        matches!(
            self,
            VoteOption::For | VoteOption::Against | VoteOption::Abstain
        )
    }

    /// Display label used by the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            VoteOption::For => "за",
            VoteOption::Against => "против",
            VoteOption::Abstain => "уздржан",
            VoteOption::DidntVote => "нисте гласали",
            VoteOption::NotEligible => "немате право гласа",
        }
    }
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome classification of a decided (or undecided) item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteResult {
    /// Quorum met and more votes for than against
    Passed,
    /// Quorum met but not more votes for than against
    Failed,
    /// Quorum not met; the item must be voted on again
    Returned,
}

/// Proposal lifecycle as seen by the front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    /// Voting may still be in progress
    Open,
    /// Voting lifecycle ended (closed, canceled or executed)
    Closed,
}

/// For/against/abstain counts, already normalised to whole votes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Votes for
    pub votes_for: u64,
    /// Votes against
    pub votes_against: u64,
    /// Abstentions
    pub votes_abstain: u64,
}

impl Tally {
    /// Create a tally from the three counts
    pub fn new(votes_for: u64, votes_against: u64, votes_abstain: u64) -> Self {
        Self {
            votes_for,
            votes_against,
            votes_abstain,
        }
    }

    /// Total cast votes
    pub fn total(&self) -> u64 {
        self.votes_for
            .saturating_add(self.votes_against)
            .saturating_add(self.votes_abstain)
    }

    /// Add `weight` votes to the bucket for `option`; non-cast options are ignored
    pub fn record(&mut self, option: VoteOption, weight: u64) {
        match option {
            VoteOption::For => self.votes_for = self.votes_for.saturating_add(weight),
            VoteOption::Against => {
                self.votes_against = self.votes_against.saturating_add(weight)
            }
            VoteOption::Abstain => {
                self.votes_abstain = self.votes_abstain.saturating_add(weight)
            }
            VoteOption::DidntVote | VoteOption::NotEligible => {}
        }
    }
}

/// An independently votable part of a multilayered proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalSubItem {
    /// Client-generated item id
    pub id: String,
    /// Item title
    pub title: String,
    /// Item description
    #[serde(default)]
    pub description: String,
    /// Votes for
    #[serde(default)]
    pub votes_for: u64,
    /// Votes against
    #[serde(default)]
    pub votes_against: u64,
    /// Abstentions
    #[serde(default)]
    pub votes_abstain: u64,
    /// The viewer's vote on this item
    #[serde(default = "not_yet_voted")]
    pub your_vote: VoteOption,
    /// One entry per known voter
    #[serde(default)]
    pub votes_for_address: BTreeMap<Address, VoteOption>,
}

fn not_yet_voted() -> VoteOption {
    VoteOption::DidntVote
}

impl ProposalSubItem {
    /// Create an item with no votes
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            votes_for: 0,
            votes_against: 0,
            votes_abstain: 0,
            your_vote: VoteOption::DidntVote,
            votes_for_address: BTreeMap::new(),
        }
    }

    /// Current counts
    pub fn tally(&self) -> Tally {
        Tally::new(self.votes_for, self.votes_against, self.votes_abstain)
    }
}

/// Display-ready projection of a governor proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    /// On-chain proposal id
    pub id: ProposalId,
    /// Title from the description payload
    pub title: String,
    /// Free-text description
    pub description: String,
    /// Proposer wallet address
    pub author: Address,
    /// Voting start
    pub date_added: DateTime<Utc>,
    /// Voting deadline
    pub closes_at: DateTime<Utc>,
    /// Votes for
    pub votes_for: u64,
    /// Votes against
    pub votes_against: u64,
    /// Abstentions
    pub votes_abstain: u64,
    /// Open or closed
    pub status: ProposalStatus,
    /// The viewer's vote
    pub your_vote: VoteOption,
    /// One entry per registered voter
    pub votes_for_address: BTreeMap<Address, VoteOption>,
    /// Whether the proposal carries sub-items
    pub is_multilayered: bool,
    /// Sub-items, empty unless `is_multilayered`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_items: Vec<ProposalSubItem>,
    /// Set while the proposal is still cancelable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_be_canceled: Option<bool>,
}

impl Proposal {
    /// Current counts
    pub fn tally(&self) -> Tally {
        Tally::new(self.votes_for, self.votes_against, self.votes_abstain)
    }

    /// Sum of all cast votes
    pub fn total_votes(&self) -> u64 {
        self.tally().total()
    }

    /// Overwrite the counts from a tally
    pub fn set_tally(&mut self, tally: Tally) {
        self.votes_for = tally.votes_for;
        self.votes_against = tally.votes_against;
        self.votes_abstain = tally.votes_abstain;
    }

    /// Sub-items, or an empty slice when the proposal is not multilayered
    pub fn sub_items(&self) -> &[ProposalSubItem] {
        if self.is_multilayered {
            &self.sub_items
        } else {
            &[]
        }
    }

    /// Whether the proposal can still be canceled; absent means no
    pub fn is_cancelable(&self) -> bool {
        self.can_be_canceled.unwrap_or(false)
    }
}

/// Announcement published through the announcements contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    /// Announcement id
    pub id: String,
    /// Message body
    pub content: String,
    /// Announcer wallet address
    pub announcer: Address,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// False once deactivated
    pub is_active: bool,
}

impl Announcement {
    /// Creation time, if the timestamp is representable
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Parse a proposal id taken from a route or user input.
///
/// Accepts decimal or `0x`-prefixed hex; anything else yields `None`.
pub fn parse_proposal_id(value: &str) -> Option<ProposalId> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    U256::from_str(trimmed).ok()
}
