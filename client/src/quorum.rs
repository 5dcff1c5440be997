//! Quorum threshold and progress.
//!
//! The threshold is a pure function of the registered-voter count, which the
//! caller reads at call time and passes in. Nothing here caches it.

use crate::types::{Proposal, Tally};
use serde::{Deserialize, Serialize};

/// Minimum total votes for a decision: `floor(n / 2) + 1`.
///
/// With no registered voters this is 1, which no proposal can reach.
pub fn quorum(total_registered_voters: u64) -> u64 {
    total_registered_voters / 2 + 1
}

/// Whether the proposal's cast votes meet the quorum for `registered_voters`
pub fn is_quorum_reached(proposal: &Proposal, registered_voters: u64) -> bool {
    is_tally_quorate(&proposal.tally(), registered_voters)
}

/// Whether a tally's cast votes meet the quorum for `registered_voters`
pub fn is_tally_quorate(tally: &Tally, registered_voters: u64) -> bool {
    tally.total() >= quorum(registered_voters)
}

/// How far a tally is from its quorum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuorumProgress {
    /// Threshold in votes
    pub quorum: u64,
    /// Cast votes so far
    pub total_votes: u64,
    /// `total_votes / quorum * 100`, not capped at 100
    pub percentage: f64,
    /// Votes still missing, zero once reached
    pub remaining: u64,
    /// Whether the threshold is met
    pub reached: bool,
}

impl QuorumProgress {
    /// Compute progress for a tally
    pub fn of(tally: &Tally, registered_voters: u64) -> Self {
        let quorum = quorum(registered_voters);
        let total_votes = tally.total();
        Self {
            quorum,
            total_votes,
            percentage: total_votes as f64 / quorum as f64 * 100.0,
            remaining: quorum.saturating_sub(total_votes),
            reached: total_votes >= quorum,
        }
    }
}
