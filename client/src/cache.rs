//! Incremental proposal cache.
//!
//! Seeded from a full load, then patched with individual vote-cast and
//! state-change events so large proposal lists need not be refetched on
//! every event. Anything the cache cannot place is reported back so the
//! caller can fall back to a full reload.

use crate::codec::GovernorState;
use crate::error::Result;
use crate::loader::normalize_votes;
use crate::source::VoteCastEvent;
use crate::types::{Address, Proposal, ProposalId, VoteOption};
use std::collections::HashMap;
use tracing::debug;

/// Proposals keyed by id, in load order
#[derive(Debug, Clone, Default)]
pub struct ProposalCache {
    proposals: Vec<Proposal>,
    index: HashMap<ProposalId, usize>,
    viewer: Address,
    decimals: u8,
}

impl ProposalCache {
    /// Create a cache from a loaded proposal list
    ///
    /// # Arguments
    /// * `proposals` - Proposals as seen by `viewer`
    /// * `viewer` - Wallet whose `your_vote` the cache maintains
    /// * `decimals` - Voting token decimals, used to normalise event weights
    pub fn from_snapshot(
        proposals: Vec<Proposal>,
        viewer: impl Into<Address>,
        decimals: u8,
    ) -> Self {
        let mut cache = Self {
            proposals: Vec::new(),
            index: HashMap::new(),
            viewer: viewer.into(),
            decimals,
        };
        cache.replace_all(proposals);
        cache
    }

    /// Drop everything and reseed from a fresh load
    pub fn replace_all(&mut self, proposals: Vec<Proposal>) {
        self.index = proposals
            .iter()
            .enumerate()
            .map(|(position, p)| (p.id, position))
            .collect();
        self.proposals = proposals;
        debug!("Proposal cache seeded with {} entries", self.proposals.len());
    }

    /// Apply one vote-cast event.
    ///
    /// Returns `Ok(false)` when the event is ignored: the proposal is not
    /// cached, the voter is not among the registered voters the proposal was
    /// loaded with, or the voter already has a vote on it. An out-of-range
    /// support code is an error.
    pub fn apply_vote_cast(&mut self, event: &VoteCastEvent) -> Result<bool> {
        let option = VoteOption::from_raw(event.support)?;
        let weight = normalize_votes(event.weight, self.decimals);

        let Some(&position) = self.index.get(&event.proposal_id) else {
            debug!("Vote for uncached proposal {}", event.proposal_id);
            return Ok(false);
        };
        let proposal = &mut self.proposals[position];

        let Some(entry) = proposal
            .votes_for_address
            .iter_mut()
            .find(|(address, _)| address.eq_ignore_ascii_case(&event.voter))
            .map(|(_, vote)| vote)
        else {
            debug!(
                "Vote by unregistered {} on {}",
                event.voter, event.proposal_id
            );
            return Ok(false);
        };
        if entry.is_cast() {
            debug!(
                "Ignoring repeated vote by {} on {}",
                event.voter, event.proposal_id
            );
            return Ok(false);
        }
        *entry = option;

        let mut tally = proposal.tally();
        tally.record(option, weight);
        proposal.set_tally(tally);

        if event.voter.eq_ignore_ascii_case(&self.viewer) {
            proposal.your_vote = option;
        }

        debug!(
            "Applied {} vote by {} on {}",
            option, event.voter, event.proposal_id
        );
        Ok(true)
    }

    /// Apply a lifecycle change; `false` if the proposal is not cached
    pub fn apply_state(&mut self, id: ProposalId, state: GovernorState) -> bool {
        let Some(&position) = self.index.get(&id) else {
            return false;
        };
        let proposal = &mut self.proposals[position];
        proposal.status = state.status();
        proposal.can_be_canceled = Some(state.is_cancelable());
        debug!("Proposal {} is now {:?}", id, state);
        true
    }

    /// Cached proposal by id
    pub fn get(&self, id: ProposalId) -> Option<&Proposal> {
        self.index.get(&id).map(|&position| &self.proposals[position])
    }

    /// All cached proposals in load order
    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    /// Wallet the cache tracks
    pub fn viewer(&self) -> &str {
        &self.viewer
    }

    /// Number of cached proposals
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvsdError;
    use crate::types::{ProposalStatus, Tally};
    use alloy_primitives::U256;
    use assert_matches::assert_matches;
    use chrono::DateTime;
    use std::collections::BTreeMap;

    const VIEWER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const OTHER: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";

    fn proposal(id: u64) -> Proposal {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let votes_for_address: BTreeMap<Address, VoteOption> = [VIEWER, OTHER]
            .into_iter()
            .map(|a| (a.to_string(), VoteOption::DidntVote))
            .collect();
        Proposal {
            id: U256::from(id),
            title: String::new(),
            description: String::new(),
            author: OTHER.to_string(),
            date_added: at,
            closes_at: at,
            votes_for: 0,
            votes_against: 0,
            votes_abstain: 0,
            status: ProposalStatus::Open,
            your_vote: VoteOption::DidntVote,
            votes_for_address,
            is_multilayered: false,
            sub_items: Vec::new(),
            can_be_canceled: Some(true),
        }
    }

    fn vote(voter: &str, id: u64, support: u8) -> VoteCastEvent {
        VoteCastEvent {
            voter: voter.to_string(),
            proposal_id: U256::from(id),
            support,
            weight: U256::from(2_000u64),
            reason: String::new(),
            block_number: Some(1),
        }
    }

    fn cache() -> ProposalCache {
        ProposalCache::from_snapshot(vec![proposal(1), proposal(2)], VIEWER, 3)
    }

    #[test]
    fn test_apply_vote_cast() {
        let mut cache = cache();
        assert!(cache.apply_vote_cast(&vote(OTHER, 1, 1)).unwrap());

        let p = cache.get(U256::from(1u64)).unwrap();
        assert_eq!(p.tally(), Tally::new(2, 0, 0));
        assert_eq!(p.votes_for_address[OTHER], VoteOption::For);
        assert_eq!(p.your_vote, VoteOption::DidntVote);
    }

    #[test]
    fn test_viewer_vote_updates_your_vote() {
        let mut cache = cache();
        assert!(cache
            .apply_vote_cast(&vote(&VIEWER.to_lowercase(), 2, 2))
            .unwrap());

        let p = cache.get(U256::from(2u64)).unwrap();
        assert_eq!(p.your_vote, VoteOption::Abstain);
        assert_eq!(p.votes_for_address[VIEWER], VoteOption::Abstain);
        assert_eq!(p.votes_for_address.len(), 2);
    }

    #[test]
    fn test_unregistered_voter_is_reported() {
        const OUTSIDER: &str = "0x90F79bf6EB2c4f870365E785982E1f101E93b906";
        let mut seeded = proposal(1);
        seeded.your_vote = VoteOption::NotEligible;
        let mut cache = ProposalCache::from_snapshot(vec![seeded.clone()], OUTSIDER, 3);

        assert!(!cache.apply_vote_cast(&vote(OUTSIDER, 1, 1)).unwrap());

        let p = cache.get(U256::from(1u64)).unwrap();
        assert_eq!(p, &seeded);
        assert_eq!(p.your_vote, VoteOption::NotEligible);
        assert_eq!(p.votes_for_address.len(), 2);
    }

    #[test]
    fn test_second_vote_is_ignored() {
        let mut cache = cache();
        assert!(cache.apply_vote_cast(&vote(OTHER, 1, 0)).unwrap());
        assert!(!cache.apply_vote_cast(&vote(OTHER, 1, 1)).unwrap());

        let p = cache.get(U256::from(1u64)).unwrap();
        assert_eq!(p.tally(), Tally::new(0, 2, 0));
        assert_eq!(p.votes_for_address[OTHER], VoteOption::Against);
    }

    #[test]
    fn test_unknown_proposal_is_reported() {
        let mut cache = cache();
        assert!(!cache.apply_vote_cast(&vote(OTHER, 9, 1)).unwrap());
        assert!(!cache.apply_state(U256::from(9u64), GovernorState::Canceled));
    }

    #[test]
    fn test_bad_support_code() {
        let mut cache = cache();
        assert_matches!(
            cache.apply_vote_cast(&vote(OTHER, 1, 3)),
            Err(EvsdError::UnknownVoteCode(3))
        );
        assert_eq!(cache.get(U256::from(1u64)).unwrap().total_votes(), 0);
    }

    #[test]
    fn test_apply_state() {
        let mut cache = cache();
        assert!(cache.apply_state(U256::from(1u64), GovernorState::Succeeded));

        let p = cache.get(U256::from(1u64)).unwrap();
        assert_eq!(p.status, ProposalStatus::Closed);
        assert_eq!(p.can_be_canceled, Some(false));
    }

    #[test]
    fn test_replace_all() {
        let mut cache = cache();
        cache.replace_all(vec![proposal(3)]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(U256::from(1u64)).is_none());
        assert!(cache.get(U256::from(3u64)).is_some());
        assert_eq!(cache.viewer(), VIEWER);
    }
}
