//! Builds proposal view-models from the contract-binding layer.
//!
//! Every load reads the event lists, the voter list and the token decimals
//! once, then fetches per-proposal state concurrently. All proposals of one
//! load therefore derive from the same event snapshot.

use crate::cache::ProposalCache;
use crate::categorize::{categorize_at, ProposalBuckets};
use crate::codec::GovernorState;
use crate::config::ClientConfig;
use crate::description::ProposalMetadata;
use crate::error::{EvsdError, Result};
use crate::names::AddressBook;
use crate::retry::RetryStrategy;
use crate::source::{GovernorSource, ProposalCreatedEvent, RawTally, VoteCastEvent};
use crate::storage::KeyValueStore;
use crate::summary::ProposalSummary;
use crate::types::{Address, Proposal, ProposalId, Tally, VoteOption};
use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One vote in a user's voting history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    /// Proposal voted on
    pub proposal_id: ProposalId,
    /// Option chosen
    pub vote: VoteOption,
    /// Block the vote was mined in
    pub block_number: Option<u64>,
}

/// Proposals and voters read from one consistent view of the chain.
///
/// Categorisation and summaries take their inputs from here so vote counts,
/// `your_vote` and the voter count never come from different reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Proposals, oldest first
    pub proposals: Vec<Proposal>,
    /// Registered voters at load time
    pub voters: Vec<Address>,
    /// Wallet the proposals were resolved for
    pub viewer: Address,
    /// Voting token decimals
    pub decimals: u8,
    /// When the load finished
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Voter count used for every quorum derived from this snapshot
    pub fn registered_voter_count(&self) -> u64 {
        self.voters.len() as u64
    }

    /// Dashboard buckets at the current time
    pub fn buckets(&self) -> ProposalBuckets<'_> {
        self.buckets_at(Utc::now())
    }

    /// Dashboard buckets as of `now`
    pub fn buckets_at(&self, now: DateTime<Utc>) -> ProposalBuckets<'_> {
        categorize_at(&self.proposals, self.registered_voter_count(), now)
    }

    /// One summary per proposal at the current time
    pub fn summaries<K: KeyValueStore>(&self, names: &AddressBook<K>) -> Vec<ProposalSummary> {
        self.summaries_at(names, Utc::now())
    }

    /// One summary per proposal as of `now`
    pub fn summaries_at<K: KeyValueStore>(
        &self,
        names: &AddressBook<K>,
        now: DateTime<Utc>,
    ) -> Vec<ProposalSummary> {
        let voters = self.registered_voter_count();
        self.proposals
            .iter()
            .map(|p| ProposalSummary::derive_at(p, voters, names, now))
            .collect()
    }

    /// Proposal by id
    pub fn get(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.iter().find(|p| p.id == id)
    }

    /// Seed an incremental cache from this snapshot
    pub fn to_cache(&self) -> ProposalCache {
        ProposalCache::from_snapshot(self.proposals.clone(), self.viewer.clone(), self.decimals)
    }
}

/// Events and token parameters shared by every proposal of one load
struct EventSnapshot {
    created: Vec<ProposalCreatedEvent>,
    votes: Vec<VoteCastEvent>,
    voters: Vec<Address>,
    decimals: u8,
}

/// Convert a fixed-point token amount to whole votes, saturating at `u64::MAX`
pub fn normalize_votes(raw: U256, decimals: u8) -> u64 {
    let one_token = U256::from(10u64).pow(U256::from(decimals));
    u64::try_from(raw / one_token).unwrap_or(u64::MAX)
}

/// Whole-vote tally from the governor's fixed-point counts
pub fn normalize_tally(raw: &RawTally, decimals: u8) -> Tally {
    Tally::new(
        normalize_votes(raw.for_votes, decimals),
        normalize_votes(raw.against_votes, decimals),
        normalize_votes(raw.abstain_votes, decimals),
    )
}

/// Per-voter vote map for one proposal.
///
/// Each registered voter maps to their first vote-cast event on the
/// proposal, or to `DidntVote`.
pub fn votes_by_address(
    proposal_id: ProposalId,
    voters: &[Address],
    events: &[VoteCastEvent],
) -> Result<BTreeMap<Address, VoteOption>> {
    let mut votes = BTreeMap::new();
    for voter in voters {
        let first = events
            .iter()
            .find(|e| e.proposal_id == proposal_id && e.voter.eq_ignore_ascii_case(voter));
        let option = match first {
            Some(event) => VoteOption::from_raw(event.support)?,
            None => VoteOption::DidntVote,
        };
        votes.insert(voter.clone(), option);
    }
    Ok(votes)
}

/// The viewer's entry in a vote map, or `NotEligible` if they are not in it
pub fn viewer_vote(votes: &BTreeMap<Address, VoteOption>, viewer: &str) -> VoteOption {
    votes
        .iter()
        .find(|(address, _)| address.eq_ignore_ascii_case(viewer))
        .map(|(_, option)| *option)
        .unwrap_or(VoteOption::NotEligible)
}

fn timestamp(secs: u64) -> Result<DateTime<Utc>> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .ok_or(EvsdError::InvalidTimestamp(secs))
}

/// Assemble a proposal from its creation event and current governor state
pub fn build_proposal(
    event: &ProposalCreatedEvent,
    state: GovernorState,
    raw_tally: &RawTally,
    deadline: u64,
    votes: &[VoteCastEvent],
    voters: &[Address],
    viewer: &str,
    decimals: u8,
) -> Result<Proposal> {
    let metadata = ProposalMetadata::from_description(&event.description);
    let votes_for_address = votes_by_address(event.proposal_id, voters, votes)?;
    let your_vote = viewer_vote(&votes_for_address, viewer);
    let tally = normalize_tally(raw_tally, decimals);

    let is_multilayered = metadata.is_multilayered;
    let title = metadata.title.clone();
    let description = metadata.description.clone();

    let mut proposal = Proposal {
        id: event.proposal_id,
        title,
        description,
        author: event.proposer.clone(),
        date_added: timestamp(event.vote_start)?,
        closes_at: timestamp(deadline)?,
        votes_for: 0,
        votes_against: 0,
        votes_abstain: 0,
        status: state.status(),
        your_vote,
        votes_for_address,
        is_multilayered,
        sub_items: metadata.into_sub_items(),
        can_be_canceled: Some(state.is_cancelable()),
    };
    proposal.set_tally(tally);
    Ok(proposal)
}

/// Loads proposals through a [`GovernorSource`]
pub struct ProposalLoader<S> {
    source: Arc<S>,
    retry: RetryStrategy,
    request_timeout: Duration,
}

impl<S> Clone for ProposalLoader<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            retry: self.retry.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

impl<S: GovernorSource> ProposalLoader<S> {
    /// Create a loader using the retry and timeout settings of `config`
    pub fn new(source: Arc<S>, config: &ClientConfig) -> Self {
        Self {
            source,
            retry: RetryStrategy::from_config(config),
            request_timeout: config.request_timeout(),
        }
    }

    /// Underlying source
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Run one binding call under the timeout, retrying transient failures
    async fn call<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timeout = self.request_timeout;
        self.retry
            .retry(|| {
                let fut = operation();
                async move {
                    tokio::time::timeout(timeout, fut)
                        .await
                        .map_err(|_| EvsdError::Timeout(timeout.as_secs()))?
                }
            })
            .await
    }

    /// Run one write under the timeout; writes are never retried
    pub(crate) async fn send<T, Fut>(&self, write: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let timeout = self.request_timeout;
        tokio::time::timeout(timeout, write)
            .await
            .map_err(|_| EvsdError::Timeout(timeout.as_secs()))?
    }

    async fn snapshot(&self) -> Result<EventSnapshot> {
        let source = &self.source;
        let (created, votes, voters, decimals) = futures::try_join!(
            self.call(|| source.proposal_created_events()),
            self.call(|| source.vote_cast_events()),
            self.call(|| source.registered_voters()),
            self.call(|| source.token_decimals()),
        )?;

        debug!(
            "Snapshot: {} proposals, {} votes, {} voters",
            created.len(),
            votes.len(),
            voters.len()
        );
        Ok(EventSnapshot {
            created,
            votes,
            voters,
            decimals,
        })
    }

    async fn build(
        &self,
        event: &ProposalCreatedEvent,
        snapshot: &EventSnapshot,
        viewer: &str,
    ) -> Result<Proposal> {
        let source = &self.source;
        let id = event.proposal_id;
        let (state, tally, deadline) = futures::try_join!(
            self.call(|| source.proposal_state(id)),
            self.call(|| source.proposal_votes(id)),
            self.call(|| source.proposal_deadline(id)),
        )?;

        build_proposal(
            event,
            state,
            &tally,
            deadline,
            &snapshot.votes,
            &snapshot.voters,
            viewer,
            snapshot.decimals,
        )
    }

    async fn build_many<'a, I>(
        &self,
        events: I,
        snapshot: &EventSnapshot,
        viewer: &str,
    ) -> Result<Vec<Proposal>>
    where
        I: IntoIterator<Item = &'a ProposalCreatedEvent>,
    {
        try_join_all(
            events
                .into_iter()
                .map(|event| self.build(event, snapshot, viewer)),
        )
        .await
    }

    /// Addresses currently holding voting rights
    pub async fn registered_voters(&self) -> Result<Vec<Address>> {
        let source = &self.source;
        self.call(|| source.registered_voters()).await
    }

    /// Load every proposal as seen by `viewer`, oldest first
    pub async fn load_all(&self, viewer: &str) -> Result<Snapshot> {
        let events = self.snapshot().await?;
        let proposals = self.build_many(&events.created, &events, viewer).await?;

        info!("Loaded {} proposals for {}", proposals.len(), viewer);
        Ok(Snapshot {
            proposals,
            voters: events.voters,
            viewer: viewer.to_string(),
            decimals: events.decimals,
            taken_at: Utc::now(),
        })
    }

    /// Load a single proposal; `None` if no creation event has that id
    pub async fn load_by_id(&self, id: ProposalId, viewer: &str) -> Result<Option<Proposal>> {
        let snapshot = self.snapshot().await?;
        let Some(event) = snapshot.created.iter().find(|e| e.proposal_id == id) else {
            debug!("Proposal {} not found", id);
            return Ok(None);
        };

        self.build(event, &snapshot, viewer).await.map(Some)
    }

    /// Load the proposals created by `author`, seen from the author's wallet
    pub async fn load_authored_by(&self, author: &str) -> Result<Vec<Proposal>> {
        let snapshot = self.snapshot().await?;
        let authored = snapshot
            .created
            .iter()
            .filter(|e| e.proposer.eq_ignore_ascii_case(author));
        let proposals = self.build_many(authored, &snapshot, author).await?;

        debug!("{} authored {} proposals", author, proposals.len());
        Ok(proposals)
    }

    /// Every vote cast by `user`, in event order
    pub async fn voting_history(&self, user: &str) -> Result<Vec<VoteRecord>> {
        let source = &self.source;
        let events = self.call(|| source.vote_cast_events()).await?;

        events
            .iter()
            .filter(|e| e.voter.eq_ignore_ascii_case(user))
            .map(|e| {
                Ok(VoteRecord {
                    proposal_id: e.proposal_id,
                    vote: VoteOption::from_raw(e.support)?,
                    block_number: e.block_number,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::storage::MemoryStore;
    use crate::types::{ProposalStatus, VoteResult};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ALICE: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const BOB: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
    const CAROL: &str = "0x90F79bf6EB2c4f870365E785982E1f101E93b906";
    const OUTSIDER: &str = "0x1234567890abcdef1234567890abcdef12345678";

    fn created(id: u64, proposer: &str, description: &str) -> ProposalCreatedEvent {
        ProposalCreatedEvent {
            proposal_id: U256::from(id),
            proposer: proposer.to_string(),
            vote_start: 1_700_000_000,
            description: description.to_string(),
        }
    }

    fn fast_config() -> ClientConfig {
        ClientConfig::localhost().with_retry_config(1, 5, 2.0)
    }

    fn source() -> MemorySource {
        let mut source = MemorySource::new(18);
        for voter in [ALICE, BOB, CAROL] {
            source.register_voter(voter);
        }
        source.create_proposal(
            created(1, ALICE, r#"{"title":"Statut","description":"Izmene statuta"}"#),
            GovernorState::Active,
            1_700_086_400,
        );
        source.create_proposal(
            created(2, BOB, "plain text"),
            GovernorState::Executed,
            1_700_086_400,
        );
        source.cast_vote(ALICE, U256::from(1u64), 1, 10);
        source.cast_vote(BOB, U256::from(1u64), 2, 11);
        source.cast_vote(ALICE, U256::from(2u64), 0, 12);
        source
    }

    #[test]
    fn test_normalize_votes() {
        let one = U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(normalize_votes(one * U256::from(3u64), 18), 3);
        assert_eq!(normalize_votes(one - U256::from(1u64), 18), 0);
        assert_eq!(normalize_votes(U256::from(7u64), 0), 7);
        assert_eq!(normalize_votes(U256::MAX, 0), u64::MAX);
    }

    #[test]
    fn test_votes_by_address_first_event_wins() {
        let id = U256::from(1u64);
        let events = vec![
            VoteCastEvent {
                voter: ALICE.to_lowercase(),
                proposal_id: id,
                support: 0,
                weight: U256::from(1u64),
                reason: String::new(),
                block_number: Some(1),
            },
            VoteCastEvent {
                voter: ALICE.to_string(),
                proposal_id: id,
                support: 1,
                weight: U256::from(1u64),
                reason: String::new(),
                block_number: Some(2),
            },
        ];
        let voters = vec![ALICE.to_string(), BOB.to_string()];

        let votes = votes_by_address(id, &voters, &events).unwrap();
        assert_eq!(votes[ALICE], VoteOption::Against);
        assert_eq!(votes[BOB], VoteOption::DidntVote);
        assert_eq!(viewer_vote(&votes, &BOB.to_lowercase()), VoteOption::DidntVote);
        assert_eq!(viewer_vote(&votes, OUTSIDER), VoteOption::NotEligible);
    }

    #[test]
    fn test_votes_by_address_rejects_unknown_code() {
        let id = U256::from(1u64);
        let events = vec![VoteCastEvent {
            voter: ALICE.to_string(),
            proposal_id: id,
            support: 5,
            weight: U256::from(1u64),
            reason: String::new(),
            block_number: None,
        }];
        let result = votes_by_address(id, &[ALICE.to_string()], &events);
        assert_matches!(result, Err(EvsdError::UnknownVoteCode(5)));
    }

    #[tokio::test]
    async fn test_load_all() {
        let loader = ProposalLoader::new(Arc::new(source()), &fast_config());
        let snapshot = loader.load_all(BOB).await.unwrap();
        let proposals = &snapshot.proposals;

        assert_eq!(snapshot.registered_voter_count(), 3);
        assert_eq!(snapshot.decimals, 18);
        assert_eq!(snapshot.viewer, BOB);
        assert_eq!(proposals.len(), 2);

        let first = &proposals[0];
        assert_eq!(first.title, "Statut");
        assert_eq!(first.tally(), Tally::new(1, 0, 1));
        assert_eq!(first.status, ProposalStatus::Open);
        assert_eq!(first.your_vote, VoteOption::Abstain);
        assert_eq!(first.votes_for_address[CAROL], VoteOption::DidntVote);
        assert_eq!(first.can_be_canceled, Some(true));
        assert_eq!(first.closes_at.timestamp(), 1_700_086_400);

        let second = &proposals[1];
        assert_eq!(second.title, "");
        assert_eq!(second.description, "plain text");
        assert_eq!(second.status, ProposalStatus::Closed);
        assert_eq!(second.your_vote, VoteOption::DidntVote);
        assert_eq!(second.can_be_canceled, Some(false));
    }

    #[tokio::test]
    async fn test_snapshot_derivations() {
        let loader = ProposalLoader::new(Arc::new(source()), &fast_config());
        let snapshot = loader.load_all(CAROL).await.unwrap();
        let now = DateTime::from_timestamp(1_700_000_100, 0).unwrap();

        let buckets = snapshot.buckets_at(now);
        assert_eq!(buckets.active_to_vote.len(), 1);
        assert_eq!(buckets.with_quorum.len(), 1);
        assert!(buckets.voted.is_empty());

        let names = AddressBook::with_default_names(MemoryStore::new());
        let summaries = snapshot.summaries_at(&names, now);
        assert_eq!(summaries[0].author_name, "Fakultet 1");
        assert_eq!(summaries[1].author_name, "Fakultet 2");
        assert_eq!(summaries[1].result, VoteResult::Returned);

        let cache = snapshot.to_cache();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.viewer(), CAROL);
        assert!(snapshot.get(U256::from(2u64)).is_some());
    }

    #[tokio::test]
    async fn test_outsider_is_not_eligible() {
        let loader = ProposalLoader::new(Arc::new(source()), &fast_config());
        let snapshot = loader.load_all(OUTSIDER).await.unwrap();
        assert!(snapshot
            .proposals
            .iter()
            .all(|p| p.your_vote == VoteOption::NotEligible));
    }

    #[tokio::test]
    async fn test_load_by_id() {
        let loader = ProposalLoader::new(Arc::new(source()), &fast_config());

        let proposal = loader.load_by_id(U256::from(2u64), ALICE).await.unwrap();
        assert_eq!(proposal.unwrap().your_vote, VoteOption::Against);

        let missing = loader.load_by_id(U256::from(99u64), ALICE).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_load_authored_by() {
        let loader = ProposalLoader::new(Arc::new(source()), &fast_config());
        let authored = loader.load_authored_by(&BOB.to_lowercase()).await.unwrap();
        assert_eq!(authored.len(), 1);
        assert_eq!(authored[0].id, U256::from(2u64));
        assert_eq!(authored[0].your_vote, VoteOption::DidntVote);
    }

    #[tokio::test]
    async fn test_voting_history() {
        let loader = ProposalLoader::new(Arc::new(source()), &fast_config());
        let history = loader.voting_history(ALICE).await.unwrap();
        assert_eq!(
            history,
            vec![
                VoteRecord {
                    proposal_id: U256::from(1u64),
                    vote: VoteOption::For,
                    block_number: Some(10),
                },
                VoteRecord {
                    proposal_id: U256::from(2u64),
                    vote: VoteOption::Against,
                    block_number: Some(12),
                },
            ]
        );
    }

    /// Fails the first `failures` decimals reads, then delegates
    struct FlakySource {
        inner: MemorySource,
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GovernorSource for FlakySource {
        async fn proposal_created_events(&self) -> Result<Vec<ProposalCreatedEvent>> {
            self.inner.proposal_created_events().await
        }

        async fn vote_cast_events(&self) -> Result<Vec<VoteCastEvent>> {
            self.inner.vote_cast_events().await
        }

        async fn registered_voters(&self) -> Result<Vec<Address>> {
            self.inner.registered_voters().await
        }

        async fn proposal_state(&self, id: ProposalId) -> Result<GovernorState> {
            self.inner.proposal_state(id).await
        }

        async fn proposal_votes(&self, id: ProposalId) -> Result<RawTally> {
            self.inner.proposal_votes(id).await
        }

        async fn proposal_deadline(&self, id: ProposalId) -> Result<u64> {
            self.inner.proposal_deadline(id).await
        }

        async fn token_decimals(&self) -> Result<u8> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(EvsdError::Source("node unavailable".to_string()));
            }
            self.inner.token_decimals().await
        }

        async fn deployment(&self) -> Result<crate::config::Deployment> {
            self.inner.deployment().await
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let flaky = Arc::new(FlakySource {
            inner: source(),
            failures: 2,
            calls: AtomicUsize::new(0),
        });
        let loader = ProposalLoader::new(flaky.clone(), &fast_config());

        let snapshot = loader.load_all(ALICE).await.unwrap();
        assert_eq!(snapshot.proposals.len(), 2);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_persistent_failure_surfaces() {
        let flaky = Arc::new(FlakySource {
            inner: source(),
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
        });
        let loader = ProposalLoader::new(flaky, &fast_config().with_max_retries(1));

        let result = loader.load_all(ALICE).await;
        assert_matches!(result, Err(EvsdError::MaxRetriesExceeded(1)));
    }
}
