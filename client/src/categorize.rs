//! Dashboard buckets.
//!
//! Every bucket is a filtered view of the input that keeps its order.
//! Proposals matching no bucket (a closed proposal the viewer never voted on)
//! simply appear nowhere.

use crate::quorum::is_quorum_reached;
use crate::time::has_expired_at;
use crate::types::{Proposal, ProposalStatus, VoteOption};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Proposals grouped for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalBuckets<'a> {
    /// Open, not expired, and the viewer has not voted
    pub active_to_vote: Vec<&'a Proposal>,
    /// The viewer voted and the voting window is over
    pub voted_and_complete: Vec<&'a Proposal>,
    /// The viewer voted, whether or not voting is over
    pub voted: Vec<&'a Proposal>,
    /// Part of `active_to_vote` that already has quorum
    pub with_quorum: Vec<&'a Proposal>,
    /// Part of `active_to_vote` still short of quorum
    pub without_quorum: Vec<&'a Proposal>,
}

impl ProposalBuckets<'_> {
    /// Whether every bucket is empty
    pub fn is_empty(&self) -> bool {
        self.active_to_vote.is_empty() && self.voted.is_empty()
    }
}

fn has_voted(proposal: &Proposal) -> bool {
    proposal.your_vote != VoteOption::DidntVote
}

fn is_complete(proposal: &Proposal, now: DateTime<Utc>) -> bool {
    proposal.status == ProposalStatus::Closed || has_expired_at(proposal.closes_at, now)
}

/// Whether the viewer can still cast a vote on `proposal` at `now`
pub fn is_active_to_vote(proposal: &Proposal, now: DateTime<Utc>) -> bool {
    proposal.status == ProposalStatus::Open
        && !has_expired_at(proposal.closes_at, now)
        && proposal.your_vote == VoteOption::DidntVote
}

/// Partition `proposals` at the current time
pub fn categorize(proposals: &[Proposal], registered_voters: u64) -> ProposalBuckets<'_> {
    categorize_at(proposals, registered_voters, Utc::now())
}

/// Partition `proposals` as of `now`
pub fn categorize_at(
    proposals: &[Proposal],
    registered_voters: u64,
    now: DateTime<Utc>,
) -> ProposalBuckets<'_> {
    let mut buckets = ProposalBuckets::default();

    for proposal in proposals {
        if is_active_to_vote(proposal, now) {
            buckets.active_to_vote.push(proposal);
            if is_quorum_reached(proposal, registered_voters) {
                buckets.with_quorum.push(proposal);
            } else {
                buckets.without_quorum.push(proposal);
            }
        }

        if has_voted(proposal) {
            buckets.voted.push(proposal);
            if is_complete(proposal, now) {
                buckets.voted_and_complete.push(proposal);
            }
        }
    }

    buckets
}
