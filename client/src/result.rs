//! Outcome classification for proposals and sub-items.

use crate::quorum::quorum;
use crate::types::{Proposal, ProposalSubItem, Tally, VoteResult};

/// Classify an outcome against an explicit quorum.
///
/// Below quorum the item is returned for revote. At or above quorum it
/// passes only with strictly more votes for than against, so ties fail.
pub fn resolve(votes_for: u64, votes_against: u64, votes_abstain: u64, quorum: u64) -> VoteResult {
    let total = Tally::new(votes_for, votes_against, votes_abstain).total();
    if total < quorum {
        VoteResult::Returned
    } else if votes_for > votes_against {
        VoteResult::Passed
    } else {
        VoteResult::Failed
    }
}

impl Tally {
    /// Classify this tally against the quorum for `registered_voters`
    pub fn resolve(&self, registered_voters: u64) -> VoteResult {
        resolve(
            self.votes_for,
            self.votes_against,
            self.votes_abstain,
            quorum(registered_voters),
        )
    }
}

/// Outcome of a proposal's main vote
pub fn resolve_proposal(proposal: &Proposal, registered_voters: u64) -> VoteResult {
    proposal.tally().resolve(registered_voters)
}

/// Outcome of a single sub-item
pub fn resolve_sub_item(item: &ProposalSubItem, registered_voters: u64) -> VoteResult {
    item.tally().resolve(registered_voters)
}
