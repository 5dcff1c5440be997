//! Mapping between governor enumerations and client-side types.
//!
//! The governor counts ballots as `0 = against`, `1 = for`, `2 = abstain`
//! and reports proposal state with the OpenZeppelin `ProposalState` codes.

use crate::error::{EvsdError, Result};
use crate::types::{ProposalStatus, VoteOption};
use serde::{Deserialize, Serialize};

/// Raw governor code for a vote against
pub const VOTE_AGAINST: u8 = 0;
/// Raw governor code for a vote for
pub const VOTE_FOR: u8 = 1;
/// Raw governor code for an abstention
pub const VOTE_ABSTAIN: u8 = 2;

impl VoteOption {
    /// Decode a raw governor vote code
    pub fn from_raw(code: u8) -> Result<Self> {
        match code {
            VOTE_AGAINST => Ok(VoteOption::Against),
            VOTE_FOR => Ok(VoteOption::For),
            VOTE_ABSTAIN => Ok(VoteOption::Abstain),
            other => Err(EvsdError::UnknownVoteCode(other)),
        }
    }

    /// Encode as a raw governor vote code.
    ///
    /// `DidntVote` and `NotEligible` have no on-chain form.
    pub fn to_raw(self) -> Result<u8> {
        match self {
            VoteOption::Against => Ok(VOTE_AGAINST),
            VoteOption::For => Ok(VOTE_FOR),
            VoteOption::Abstain => Ok(VOTE_ABSTAIN),
            VoteOption::DidntVote | VoteOption::NotEligible => {
                Err(EvsdError::InvalidConversion(self))
            }
        }
    }
}

impl TryFrom<u8> for VoteOption {
    type Error = EvsdError;

    fn try_from(code: u8) -> Result<Self> {
        VoteOption::from_raw(code)
    }
}

/// Governor proposal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GovernorState {
    /// Created, voting not started
    Pending,
    /// Voting in progress
    Active,
    /// Canceled by the proposer
    Canceled,
    /// Voting ended without quorum or majority
    Defeated,
    /// Voting ended with quorum and majority
    Succeeded,
    /// Queued in the timelock
    Queued,
    /// Timelock expired without execution
    Expired,
    /// Executed
    Executed,
}

impl GovernorState {
    /// Decode a raw governor state code
    pub fn from_raw(code: u8) -> Result<Self> {
        let state = match code {
            0 => GovernorState::Pending,
            1 => GovernorState::Active,
            2 => GovernorState::Canceled,
            3 => GovernorState::Defeated,
            4 => GovernorState::Succeeded,
            5 => GovernorState::Queued,
            6 => GovernorState::Expired,
            7 => GovernorState::Executed,
            other => return Err(EvsdError::UnknownProposalState(other)),
        };
        Ok(state)
    }

    /// Front-end status: only pending and active proposals are open
    pub fn status(&self) -> ProposalStatus {
        match self {
            GovernorState::Pending | GovernorState::Active => ProposalStatus::Open,
            _ => ProposalStatus::Closed,
        }
    }

    /// Whether the proposer may still cancel
    pub fn is_cancelable(&self) -> bool {
        matches!(self, GovernorState::Pending | GovernorState::Active)
    }
}

impl TryFrom<u8> for GovernorState {
    type Error = EvsdError;

    fn try_from(code: u8) -> Result<Self> {
        GovernorState::from_raw(code)
    }
}
