//! eVSD Proposal View-Model Layer
//!
//! This library turns the raw governor records of the eVSD campus voting
//! platform into the display-ready shape the dashboard renders: decoded vote
//! options, quorum and outcome classification, dashboard buckets, remaining
//! time and faculty display names.
//!
//! # Features
//!
//! - **Vote Codec**: Map governor support codes to vote options and back
//! - **Quorum & Results**: Pure functions of an explicitly passed voter count
//! - **Categorization**: Dashboard buckets computed from one consistent snapshot
//! - **Proposal Loading**: Concurrent per-proposal reads with retry and timeouts
//! - **Incremental Cache**: Patch loaded proposals with single vote-cast events
//! - **Display Names**: Built-in faculty table plus persisted overrides
//! - **Announcements**: Active list, live updates and a local "seen" list
//! - **Transactions**: Votes, proposals, cancellation and announcements,
//!   encoded and checked before they reach the binding
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use evsd_client::{ClientConfig, EvsdClient, MemorySource, MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     evsd_client::init_tracing();
//!
//!     let source = Arc::new(MemorySource::new(18));
//!     let client = EvsdClient::new(ClientConfig::localhost(), source, MemoryStore::new())?;
//!
//!     let viewer = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
//!     let snapshot = client.snapshot(viewer).await?;
//!     let buckets = snapshot.buckets();
//!
//!     println!("{} proposals waiting for a vote", buckets.active_to_vote.len());
//!     Ok(())
//! }
//! ```
//!
//! # Examples
//!
//! ## Casting a vote
//!
//! ```rust,no_run
//! use evsd_client::{ClientConfig, EvsdClient, MemorySource, MemoryStore, VoteOption};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = EvsdClient::new(
//!     ClientConfig::localhost(),
//!     Arc::new(MemorySource::new(18)),
//!     MemoryStore::new(),
//! )?;
//! client.verify_deployment().await?;
//!
//! let voter = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
//! let id = evsd_client::parse_proposal_id("1").ok_or("invalid proposal id")?;
//! client.cast_vote(voter, id, VoteOption::For).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Summaries for the results page
//!
//! ```rust,no_run
//! use evsd_client::{
//!     ClientConfig, DateWindow, EvsdClient, MemorySource, MemoryStore, ResultsFilter,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = EvsdClient::new(
//!     ClientConfig::localhost(),
//!     Arc::new(MemorySource::new(18)),
//!     MemoryStore::new(),
//! )?;
//!
//! let snapshot = client.snapshot("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").await?;
//! let filter = ResultsFilter::new()
//!     .with_search("statut")
//!     .with_window(DateWindow::Quarter);
//!
//! for proposal in filter.apply(&snapshot.proposals, |a| client.names().resolve_name(a)) {
//!     println!("{}: {}", proposal.id, proposal.title);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod announcements;
pub mod cache;
pub mod categorize;
pub mod codec;
pub mod config;
pub mod description;
pub mod error;
pub mod filter;
pub mod loader;
pub mod names;
pub mod quorum;
pub mod result;
pub mod retry;
pub mod source;
pub mod storage;
pub mod summary;
pub mod time;
pub mod types;

// Re-export commonly used types
pub use announcements::AnnouncementFeed;
pub use cache::ProposalCache;
pub use categorize::{categorize, categorize_at, ProposalBuckets};
pub use codec::GovernorState;
pub use config::{ClientConfig, ContractAddresses, Deployment, Network};
pub use description::ProposalMetadata;
pub use error::{EvsdError, Result};
pub use filter::{DateWindow, ResultsFilter};
pub use loader::{ProposalLoader, Snapshot, VoteRecord};
pub use names::{truncate_address, AddressBook};
pub use quorum::{is_quorum_reached, quorum, QuorumProgress};
pub use result::resolve;
pub use retry::RetryStrategy;
pub use source::{
    AnnouncementRecord, AnnouncementSource, AnnouncementWriter, GovernorSource, GovernorWriter,
    MemorySource, ProposalCreatedEvent, RawTally, VoteCastEvent,
};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, SharedStore};
pub use summary::{ProposalSummary, SubItemSummary};
pub use time::{has_expired, remaining_time};
pub use types::{
    parse_proposal_id, Address, Announcement, Proposal, ProposalId, ProposalStatus,
    ProposalSubItem, Tally, VoteOption, VoteResult,
};

use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a `tracing` subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Main client combining proposal loading, display names and announcements
/// into a single interface.
///
/// Both the name overrides and the seen-announcement list persist through
/// the same store `K`.
pub struct EvsdClient<S, K> {
    /// Proposal loader
    loader: ProposalLoader<S>,
    /// Display-name table
    names: AddressBook<SharedStore<K>>,
    /// Announcement feed
    announcements: AnnouncementFeed<SharedStore<K>>,
    /// Configuration
    config: Arc<ClientConfig>,
}

impl<S: GovernorSource, K: KeyValueStore> EvsdClient<S, K> {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration; validated here
    /// * `source` - Contract-binding layer
    /// * `store` - Persistence for name overrides and seen announcements
    pub fn new(config: ClientConfig, source: Arc<S>, store: K) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing eVSD client for network: {:?} ({})",
            config.network, config.rpc_url
        );

        let store = SharedStore::new(store);
        let loader = ProposalLoader::new(source, &config);
        let names = AddressBook::new(config.faculty_names.clone(), store.clone());
        let announcements = AnnouncementFeed::new(store);

        Ok(Self {
            loader,
            names,
            announcements,
            config: Arc::new(config),
        })
    }

    /// Check that the binding is connected to the configured node, chain
    /// and contracts
    pub async fn verify_deployment(&self) -> Result<()> {
        let deployment = self.loader.source().deployment().await?;
        self.config.check_deployment(&deployment)?;
        debug!("Binding matches configured deployment on chain {}", deployment.chain_id);
        Ok(())
    }

    /// Load every proposal as seen by `viewer`
    pub async fn snapshot(&self, viewer: &str) -> Result<Snapshot> {
        self.loader.load_all(viewer).await
    }

    /// Load one proposal; `None` if it does not exist
    pub async fn proposal(&self, id: ProposalId, viewer: &str) -> Result<Option<Proposal>> {
        self.loader.load_by_id(id, viewer).await
    }

    /// Proposals created by `author`
    pub async fn authored_by(&self, author: &str) -> Result<Vec<Proposal>> {
        self.loader.load_authored_by(author).await
    }

    /// Every vote cast by `user`
    pub async fn voting_history(&self, user: &str) -> Result<Vec<VoteRecord>> {
        self.loader.voting_history(user).await
    }

    /// Addresses currently holding voting rights
    pub async fn registered_voters(&self) -> Result<Vec<Address>> {
        self.loader.registered_voters().await
    }

    /// Display-name table
    pub fn names(&self) -> &AddressBook<SharedStore<K>> {
        &self.names
    }

    /// Set or change the display name of a faculty wallet
    pub fn register_faculty_name(&mut self, address: &str, name: &str) -> Result<()> {
        self.names.register_override(address, name)
    }

    /// Announcement feed as last refreshed
    pub fn feed(&self) -> &AnnouncementFeed<SharedStore<K>> {
        &self.announcements
    }

    /// Mutable feed, for live events and marking announcements seen
    pub fn feed_mut(&mut self) -> &mut AnnouncementFeed<SharedStore<K>> {
        &mut self.announcements
    }

    /// Get the loader
    pub fn loader(&self) -> &ProposalLoader<S> {
        &self.loader
    }

    /// Get configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl<S: GovernorSource + AnnouncementSource, K: KeyValueStore> EvsdClient<S, K> {
    /// Refetch the active announcements and replace the feed with them
    pub async fn announcements(&mut self) -> Result<&[Announcement]> {
        let records = self.loader.source().active_announcements().await?;
        self.announcements
            .replace(announcements::from_active_list(records));
        Ok(self.announcements.announcements())
    }
}

impl<S: GovernorSource + GovernorWriter, K: KeyValueStore> EvsdClient<S, K> {
    /// Cast `voter`'s ballot on proposal `id`.
    ///
    /// Only `For`, `Against` and `Abstain` have an on-chain form; other
    /// options fail with [`EvsdError::InvalidConversion`] before anything is
    /// sent.
    pub async fn cast_vote(&self, voter: &str, id: ProposalId, option: VoteOption) -> Result<()> {
        let support = option.to_raw()?;
        self.loader
            .send(self.loader.source().submit_vote(voter, id, support))
            .await?;

        info!("{} voted {} on proposal {}", voter, option, id);
        Ok(())
    }

    /// Submit a proposal with no on-chain actions; returns its id
    pub async fn propose(&self, proposer: &str, metadata: &ProposalMetadata) -> Result<ProposalId> {
        metadata.validate()?;
        let description = metadata.to_description()?;
        let id = self
            .loader
            .send(self.loader.source().submit_proposal(proposer, &description))
            .await?;

        info!("Proposal {} submitted by {}", id, proposer);
        Ok(id)
    }

    /// Cancel a proposal that is still pending or active
    pub async fn cancel_proposal(&self, caller: &str, id: ProposalId) -> Result<()> {
        let source = self.loader.source();
        let state = self.loader.send(source.proposal_state(id)).await?;
        if !state.is_cancelable() {
            return Err(EvsdError::NotCancelable {
                id: id.to_string(),
                state,
            });
        }
        self.loader.send(source.submit_cancel(caller, id)).await?;

        info!("Proposal {} canceled by {}", id, caller);
        Ok(())
    }
}

impl<S: GovernorSource + AnnouncementWriter, K: KeyValueStore> EvsdClient<S, K> {
    /// Publish an announcement
    pub async fn create_announcement(&self, announcer: &str, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(EvsdError::InvalidInput(
                "Announcement content is required".to_string(),
            ));
        }
        self.loader
            .send(self.loader.source().submit_announcement(announcer, content))
            .await?;

        info!("Announcement published by {}", announcer);
        Ok(())
    }

    /// Deactivate the announcement stored at `index` in the contract
    pub async fn deactivate_announcement(&self, caller: &str, index: u64) -> Result<()> {
        self.loader
            .send(self.loader.source().submit_deactivation(caller, index))
            .await?;

        info!("Announcement {} deactivated by {}", index, caller);
        Ok(())
    }
}

impl<S: GovernorSource> EvsdClient<S, JsonFileStore> {
    /// Create a client persisting its local state to `config.name_store_path`
    pub fn with_file_store(config: ClientConfig, source: Arc<S>) -> Result<Self> {
        let path = config.name_store_path.clone().ok_or_else(|| {
            EvsdError::ConfigError("name_store_path is required for a file store".to_string())
        })?;
        let store = JsonFileStore::open(path)?;
        Self::new(config, source, store)
    }
}
