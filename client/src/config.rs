//! Network and contract configuration.
//!
//! Holds the RPC endpoint, the deployed contract addresses, retry knobs and
//! the built-in faculty display names. Loadable from a TOML file.

use crate::error::{EvsdError, Result};
use crate::names::default_faculty_names;
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Network type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Local development node (Hardhat)
    Localhost,
    /// Sepolia testnet
    Sepolia,
    /// Custom network with user-defined endpoint
    Custom,
}

impl Network {
    /// EIP-155 chain id
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Localhost => 31337,
            Network::Sepolia => 11155111,
            Network::Custom => 0,
        }
    }

    /// Default JSON-RPC URL for this network
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Localhost => "http://127.0.0.1:8545",
            Network::Sepolia => "https://rpc.sepolia.org",
            Network::Custom => "",
        }
    }
}

/// Deployed contract addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// Governor contract
    pub governor: Address,
    /// Voting token contract
    pub token: Address,
    /// Announcements contract
    pub announcements: Address,
}

impl Default for ContractAddresses {
    /// First three deployments from the default local deployer account
    fn default() -> Self {
        Self {
            token: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            governor: "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".to_string(),
            announcements: "0x9fE46736679d2D9a65F0992F80C2C8a4c3302926".to_string(),
        }
    }
}

/// Node, chain and contracts a binding is connected to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// JSON-RPC endpoint URL
    pub rpc_url: String,
    /// Chain id
    pub chain_id: u64,
    /// Deployed contracts
    pub contracts: ContractAddresses,
}

impl Deployment {
    /// Deployment on the default endpoint of `network`
    pub fn for_network(network: Network, contracts: ContractAddresses) -> Self {
        Self {
            rpc_url: network.default_rpc_url().to_string(),
            chain_id: network.chain_id(),
            contracts,
        }
    }
}

/// Configuration for the eVSD client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Network to connect to
    pub network: Network,

    /// JSON-RPC endpoint URL
    pub rpc_url: String,

    /// Chain id
    pub chain_id: u64,

    /// Deployed contracts
    pub contracts: ContractAddresses,

    /// Timeout for a single binding-layer call (in seconds)
    pub request_timeout_secs: u64,

    /// Maximum number of retries for failed reads
    pub max_retries: usize,

    /// Initial retry delay (in milliseconds)
    pub retry_initial_delay_ms: u64,

    /// Maximum retry delay (in milliseconds)
    pub retry_max_delay_ms: u64,

    /// Retry backoff multiplier
    pub retry_multiplier: f64,

    /// Built-in address to faculty name table
    pub faculty_names: BTreeMap<Address, String>,

    /// JSON file backing the display-name overrides, if persisted
    pub name_store_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Create a new configuration for the specified network
    pub fn new(network: Network) -> Self {
        Self {
            network,
            rpc_url: network.default_rpc_url().to_string(),
            chain_id: network.chain_id(),
            contracts: ContractAddresses::default(),
            request_timeout_secs: 30,
            max_retries: 3,
            retry_initial_delay_ms: 100,
            retry_max_delay_ms: 5000,
            retry_multiplier: 2.0,
            faculty_names: default_faculty_names(),
            name_store_path: None,
        }
    }

    /// Create configuration for a local development node
    pub fn localhost() -> Self {
        Self::new(Network::Localhost)
    }

    /// Create configuration for Sepolia
    pub fn sepolia() -> Self {
        Self::new(Network::Sepolia)
    }

    /// Create a custom configuration
    pub fn custom(rpc_url: String, chain_id: u64, contracts: ContractAddresses) -> Result<Self> {
        if rpc_url.is_empty() {
            return Err(EvsdError::ConfigError("RPC URL cannot be empty".to_string()));
        }
        Url::parse(&rpc_url)?;

        Ok(Self {
            rpc_url,
            chain_id,
            contracts,
            ..Self::new(Network::Custom)
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EvsdError::ConfigError(format!(
                "Failed to read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let config: ClientConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Set maximum retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set retry delays
    pub fn with_retry_config(
        mut self,
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
    ) -> Self {
        self.retry_initial_delay_ms = initial_delay_ms;
        self.retry_max_delay_ms = max_delay_ms;
        self.retry_multiplier = multiplier;
        self
    }

    /// Replace the built-in faculty name table
    pub fn with_faculty_names(mut self, names: BTreeMap<Address, String>) -> Self {
        self.faculty_names = names;
        self
    }

    /// Persist display-name overrides in a JSON file
    pub fn with_name_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.name_store_path = Some(path.into());
        self
    }

    /// Per-call timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The deployment this configuration points at
    pub fn deployment(&self) -> Deployment {
        Deployment {
            rpc_url: self.rpc_url.clone(),
            chain_id: self.chain_id,
            contracts: self.contracts.clone(),
        }
    }

    /// Check that a binding is connected to the configured deployment.
    ///
    /// Endpoints are compared as parsed URLs and contract addresses ignore
    /// letter case.
    pub fn check_deployment(&self, actual: &Deployment) -> Result<()> {
        if Url::parse(&self.rpc_url)? != Url::parse(&actual.rpc_url)? {
            return Err(EvsdError::DeploymentMismatch(format!(
                "connected to {}, configured {}",
                actual.rpc_url, self.rpc_url
            )));
        }
        if self.chain_id != actual.chain_id {
            return Err(EvsdError::DeploymentMismatch(format!(
                "chain id {}, configured {}",
                actual.chain_id, self.chain_id
            )));
        }

        for (label, expected, found) in [
            ("governor", &self.contracts.governor, &actual.contracts.governor),
            ("token", &self.contracts.token, &actual.contracts.token),
            (
                "announcements",
                &self.contracts.announcements,
                &actual.contracts.announcements,
            ),
        ] {
            if !expected.eq_ignore_ascii_case(found) {
                return Err(EvsdError::DeploymentMismatch(format!(
                    "{} contract at {}, configured {}",
                    label, found, expected
                )));
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(EvsdError::ConfigError("RPC URL cannot be empty".to_string()));
        }
        Url::parse(&self.rpc_url)?;

        for (label, address) in [
            ("governor", &self.contracts.governor),
            ("token", &self.contracts.token),
            ("announcements", &self.contracts.announcements),
        ] {
            if !is_valid_address(address) {
                return Err(EvsdError::ConfigError(format!(
                    "Invalid {} contract address: {}",
                    label, address
                )));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(EvsdError::ConfigError(
                "Request timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(EvsdError::ConfigError(
                "Max retries must be greater than 0".to_string(),
            ));
        }
        if self.retry_initial_delay_ms == 0 {
            return Err(EvsdError::ConfigError(
                "Retry initial delay must be greater than 0".to_string(),
            ));
        }
        if self.retry_multiplier <= 1.0 {
            return Err(EvsdError::ConfigError(
                "Retry multiplier must be greater than 1.0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::localhost()
    }
}

/// Whether `address` is `0x` followed by 40 hex digits
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
