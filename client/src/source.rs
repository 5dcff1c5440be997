//! Boundary to the contract-binding layer.
//!
//! Decoding of on-chain events and calls happens behind these traits. The
//! view-model layer only consumes their already-decoded records, and hands
//! already-encoded arguments to the write side.

use crate::codec::{GovernorState, VOTE_ABSTAIN, VOTE_AGAINST, VOTE_FOR};
use crate::config::{ContractAddresses, Deployment, Network};
use crate::error::{EvsdError, Result};
use crate::types::{Address, ProposalId};
use alloy_primitives::{keccak256, U256};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Voting period of proposals submitted to a [`MemorySource`], in seconds
pub const DEFAULT_VOTING_PERIOD: u64 = 7 * 24 * 3600;

/// Decoded `ProposalCreated` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalCreatedEvent {
    /// Proposal id
    pub proposal_id: ProposalId,
    /// Proposer address
    pub proposer: Address,
    /// Voting start, seconds since the Unix epoch
    pub vote_start: u64,
    /// Raw description string
    pub description: String,
}

/// Decoded `VoteCast` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteCastEvent {
    /// Voter address
    pub voter: Address,
    /// Proposal id
    pub proposal_id: ProposalId,
    /// Raw support code (0 against, 1 for, 2 abstain)
    pub support: u8,
    /// Voting weight in token base units
    pub weight: U256,
    /// Optional reason string
    pub reason: String,
    /// Block the vote was mined in
    pub block_number: Option<u64>,
}

/// Counted votes as reported by the governor, in token base units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawTally {
    /// Votes against
    pub against_votes: U256,
    /// Votes for
    pub for_votes: U256,
    /// Abstentions
    pub abstain_votes: U256,
}

/// Entry of the announcements contract's active list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementRecord {
    /// Message body
    pub content: String,
    /// Announcer address
    pub announcer: Address,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    /// Active flag
    pub is_active: bool,
}

/// Read access to the governor and token contracts
#[async_trait]
pub trait GovernorSource: Send + Sync {
    /// All proposal-created events, oldest first
    async fn proposal_created_events(&self) -> Result<Vec<ProposalCreatedEvent>>;

    /// All vote-cast events, oldest first
    async fn vote_cast_events(&self) -> Result<Vec<VoteCastEvent>>;

    /// Addresses currently holding voting rights
    async fn registered_voters(&self) -> Result<Vec<Address>>;

    /// Lifecycle state of a proposal
    async fn proposal_state(&self, id: ProposalId) -> Result<GovernorState>;

    /// Counted votes of a proposal
    async fn proposal_votes(&self, id: ProposalId) -> Result<RawTally>;

    /// Voting deadline, seconds since the Unix epoch
    async fn proposal_deadline(&self, id: ProposalId) -> Result<u64>;

    /// Decimals of the voting token
    async fn token_decimals(&self) -> Result<u8>;

    /// Node, chain and contracts the binding is connected to
    async fn deployment(&self) -> Result<Deployment>;
}

/// Transactions against the governor, sent from a connected wallet
#[async_trait]
pub trait GovernorWriter: Send + Sync {
    /// Cast `voter`'s ballot with a raw support code
    async fn submit_vote(&self, voter: &str, id: ProposalId, support: u8) -> Result<()>;

    /// Create a proposal with no on-chain actions; returns its id
    async fn submit_proposal(&self, proposer: &str, description: &str) -> Result<ProposalId>;

    /// Cancel a proposal on behalf of its proposer
    async fn submit_cancel(&self, caller: &str, id: ProposalId) -> Result<()>;
}

/// Read access to the announcements contract
#[async_trait]
pub trait AnnouncementSource: Send + Sync {
    /// Currently active announcements
    async fn active_announcements(&self) -> Result<Vec<AnnouncementRecord>>;
}

/// Transactions against the announcements contract
#[async_trait]
pub trait AnnouncementWriter: Send + Sync {
    /// Publish a new announcement
    async fn submit_announcement(&self, announcer: &str, content: &str) -> Result<()>;

    /// Deactivate the announcement stored at `index` in the contract
    async fn submit_deactivation(&self, caller: &str, index: u64) -> Result<()>;
}

/// Per-proposal state held by [`MemorySource`]
#[derive(Debug, Clone)]
struct ProposalEntry {
    proposer: Address,
    state: GovernorState,
    tally: RawTally,
    deadline: u64,
}

#[derive(Debug, Clone)]
struct MemoryState {
    decimals: u8,
    voting_period: u64,
    deployment: Deployment,
    voters: Vec<Address>,
    created: Vec<ProposalCreatedEvent>,
    votes: Vec<VoteCastEvent>,
    entries: HashMap<ProposalId, ProposalEntry>,
    announcements: Vec<AnnouncementRecord>,
}

impl MemoryState {
    fn one_token(&self) -> U256 {
        U256::from(10u64).pow(U256::from(self.decimals))
    }

    fn entry(&self, id: ProposalId) -> Result<&ProposalEntry> {
        self.entries
            .get(&id)
            .ok_or_else(|| EvsdError::ProposalNotFound(id.to_string()))
    }

    fn is_voter(&self, address: &str) -> bool {
        self.voters.iter().any(|v| v.eq_ignore_ascii_case(address))
    }

    fn has_voted(&self, voter: &str, id: ProposalId) -> bool {
        self.votes
            .iter()
            .any(|v| v.proposal_id == id && v.voter.eq_ignore_ascii_case(voter))
    }

    fn next_block(&self) -> u64 {
        self.votes
            .iter()
            .filter_map(|v| v.block_number)
            .max()
            .map_or(1, |b| b + 1)
    }

    fn record_vote(&mut self, voter: Address, proposal_id: ProposalId, support: u8, block: u64) {
        let weight = self.one_token();
        if let Some(entry) = self.entries.get_mut(&proposal_id) {
            match support {
                VOTE_AGAINST => entry.tally.against_votes += weight,
                VOTE_FOR => entry.tally.for_votes += weight,
                VOTE_ABSTAIN => entry.tally.abstain_votes += weight,
                _ => {}
            }
        }
        self.votes.push(VoteCastEvent {
            voter,
            proposal_id,
            support,
            weight,
            reason: String::new(),
            block_number: Some(block),
        });
    }

    fn record_proposal(
        &mut self,
        event: ProposalCreatedEvent,
        state: GovernorState,
        deadline: u64,
    ) {
        self.entries.insert(
            event.proposal_id,
            ProposalEntry {
                proposer: event.proposer.clone(),
                state,
                tally: RawTally::default(),
                deadline,
            },
        );
        self.created.push(event);
    }
}

/// In-memory contract state, for tests and demos.
///
/// Vote-cast events recorded through [`MemorySource::cast_vote`] also update
/// the counted votes, the way the governor would. The write traits enforce
/// the governor's own checks: only registered voters vote or propose, one
/// ballot per voter, and only the proposer cancels.
#[derive(Debug)]
pub struct MemorySource {
    state: Mutex<MemoryState>,
}

impl MemorySource {
    /// Create an empty source for a token with `decimals`
    pub fn new(decimals: u8) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                decimals,
                voting_period: DEFAULT_VOTING_PERIOD,
                deployment: Deployment::for_network(
                    Network::Localhost,
                    ContractAddresses::default(),
                ),
                voters: Vec::new(),
                created: Vec::new(),
                votes: Vec::new(),
                entries: HashMap::new(),
                announcements: Vec::new(),
            }),
        }
    }

    /// Report `deployment` as the connected node, chain and contracts
    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.state_mut().deployment = deployment;
        self
    }

    /// Set the voting period of submitted proposals, in seconds
    pub fn with_voting_period(mut self, seconds: u64) -> Self {
        self.state_mut().voting_period = seconds;
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut MemoryState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// One whole token in base units
    pub fn one_token(&self) -> U256 {
        self.state().one_token()
    }

    /// Grant voting rights
    pub fn register_voter(&mut self, voter: impl Into<Address>) {
        self.state_mut().voters.push(voter.into());
    }

    /// Record a proposal creation
    pub fn create_proposal(
        &mut self,
        event: ProposalCreatedEvent,
        state: GovernorState,
        deadline: u64,
    ) {
        self.state_mut().record_proposal(event, state, deadline);
    }

    /// Record a vote of one whole token and count it, without the
    /// governor's eligibility checks
    pub fn cast_vote(
        &mut self,
        voter: impl Into<Address>,
        proposal_id: ProposalId,
        support: u8,
        block_number: u64,
    ) {
        self.state_mut()
            .record_vote(voter.into(), proposal_id, support, block_number);
    }

    /// Change a proposal's lifecycle state
    pub fn set_state(&mut self, proposal_id: ProposalId, state: GovernorState) {
        if let Some(entry) = self.state_mut().entries.get_mut(&proposal_id) {
            entry.state = state;
        }
    }

    /// Publish an announcement
    pub fn announce(&mut self, record: AnnouncementRecord) {
        self.state_mut().announcements.push(record);
    }

    /// Recorded vote-cast events
    pub fn votes(&self) -> Vec<VoteCastEvent> {
        self.state().votes.clone()
    }

    /// Every announcement ever published, active or not
    pub fn all_announcements(&self) -> Vec<AnnouncementRecord> {
        self.state().announcements.clone()
    }
}

impl Clone for MemorySource {
    fn clone(&self) -> Self {
        Self {
            state: Mutex::new(self.state().clone()),
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new(18)
    }
}

#[async_trait]
impl GovernorSource for MemorySource {
    async fn proposal_created_events(&self) -> Result<Vec<ProposalCreatedEvent>> {
        Ok(self.state().created.clone())
    }

    async fn vote_cast_events(&self) -> Result<Vec<VoteCastEvent>> {
        Ok(self.state().votes.clone())
    }

    async fn registered_voters(&self) -> Result<Vec<Address>> {
        Ok(self.state().voters.clone())
    }

    async fn proposal_state(&self, id: ProposalId) -> Result<GovernorState> {
        Ok(self.state().entry(id)?.state)
    }

    async fn proposal_votes(&self, id: ProposalId) -> Result<RawTally> {
        Ok(self.state().entry(id)?.tally)
    }

    async fn proposal_deadline(&self, id: ProposalId) -> Result<u64> {
        Ok(self.state().entry(id)?.deadline)
    }

    async fn token_decimals(&self) -> Result<u8> {
        Ok(self.state().decimals)
    }

    async fn deployment(&self) -> Result<Deployment> {
        Ok(self.state().deployment.clone())
    }
}

#[async_trait]
impl GovernorWriter for MemorySource {
    async fn submit_vote(&self, voter: &str, id: ProposalId, support: u8) -> Result<()> {
        let mut state = self.state();
        if state.entry(id)?.state != GovernorState::Active {
            return Err(EvsdError::Source(format!(
                "vote not currently active on {}",
                id
            )));
        }
        if !state.is_voter(voter) {
            return Err(EvsdError::Source(format!("{} has no voting rights", voter)));
        }
        if state.has_voted(voter, id) {
            return Err(EvsdError::Source(format!("{} already voted on {}", voter, id)));
        }
        if support > VOTE_ABSTAIN {
            return Err(EvsdError::Source(format!("invalid vote type {}", support)));
        }

        let block = state.next_block();
        state.record_vote(voter.to_string(), id, support, block);
        Ok(())
    }

    async fn submit_proposal(&self, proposer: &str, description: &str) -> Result<ProposalId> {
        let mut state = self.state();
        if !state.is_voter(proposer) {
            return Err(EvsdError::Source(format!(
                "{} is below the proposal threshold",
                proposer
            )));
        }

        let id = U256::from_be_bytes(keccak256(description.as_bytes()).0);
        if state.entries.contains_key(&id) {
            return Err(EvsdError::Source(format!("proposal {} already exists", id)));
        }

        let now = Utc::now().timestamp().max(0) as u64;
        let deadline = now + state.voting_period;
        state.record_proposal(
            ProposalCreatedEvent {
                proposal_id: id,
                proposer: proposer.to_string(),
                vote_start: now,
                description: description.to_string(),
            },
            GovernorState::Active,
            deadline,
        );
        Ok(id)
    }

    async fn submit_cancel(&self, caller: &str, id: ProposalId) -> Result<()> {
        let mut state = self.state();
        let entry = state
            .entries
            .get_mut(&id)
            .ok_or_else(|| EvsdError::ProposalNotFound(id.to_string()))?;
        if !entry.proposer.eq_ignore_ascii_case(caller) {
            return Err(EvsdError::Source(format!(
                "{} is not the proposer of {}",
                caller, id
            )));
        }
        if !entry.state.is_cancelable() {
            return Err(EvsdError::Source(format!("proposal {} is {:?}", id, entry.state)));
        }
        entry.state = GovernorState::Canceled;
        Ok(())
    }
}

#[async_trait]
impl AnnouncementSource for MemorySource {
    async fn active_announcements(&self) -> Result<Vec<AnnouncementRecord>> {
        Ok(self
            .state()
            .announcements
            .iter()
            .filter(|a| a.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnnouncementWriter for MemorySource {
    async fn submit_announcement(&self, announcer: &str, content: &str) -> Result<()> {
        self.state().announcements.push(AnnouncementRecord {
            content: content.to_string(),
            announcer: announcer.to_string(),
            timestamp: Utc::now().timestamp().max(0) as u64,
            is_active: true,
        });
        Ok(())
    }

    async fn submit_deactivation(&self, caller: &str, index: u64) -> Result<()> {
        let mut state = self.state();
        let position = usize::try_from(index).unwrap_or(usize::MAX);
        let record = state
            .announcements
            .get_mut(position)
            .ok_or_else(|| EvsdError::Source(format!("no announcement at index {}", index)))?;
        if !record.announcer.eq_ignore_ascii_case(caller) {
            return Err(EvsdError::Source(format!(
                "{} did not publish announcement {}",
                caller, index
            )));
        }
        record.is_active = false;
        Ok(())
    }
}
