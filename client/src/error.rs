//! Error types for the eVSD view-model layer.
//!
//! Conversion faults in the vote codec are data-integrity errors coming from
//! the upstream event source. They are propagated, never coerced.

use crate::codec::GovernorState;
use crate::types::VoteOption;
use thiserror::Error;

/// Main error type for eVSD client operations
#[derive(Error, Debug)]
pub enum EvsdError {
    /// A client-side vote option has no on-chain representation
    #[error("Vote option {0:?} has no on-chain representation")]
    InvalidConversion(VoteOption),

    /// A raw governor vote code outside {0, 1, 2}
    #[error("Unknown vote code: {0}")]
    UnknownVoteCode(u8),

    /// A raw governor proposal state outside the known range
    #[error("Unknown proposal state: {0}")]
    UnknownProposalState(u8),

    /// A contract timestamp that does not map to a calendar date
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(u64),

    /// No proposal-created event exists for the requested id
    #[error("Proposal not found: {0}")]
    ProposalNotFound(String),

    /// Failure reported by the contract-binding layer
    #[error("Contract source error: {0}")]
    Source(String),

    /// A binding-layer call did not complete in time
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    /// Max retries exceeded
    #[error("Max retries ({0}) exceeded")]
    MaxRetriesExceeded(usize),

    /// Key-value store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem error from a file-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The binding is connected to a different node, chain or contract set
    #[error("Deployment mismatch: {0}")]
    DeploymentMismatch(String),

    /// A proposal in a state that no longer allows the requested action
    #[error("Proposal {id} cannot be canceled in state {state:?}")]
    NotCancelable {
        /// Proposal id
        id: String,
        /// Current governor state
        state: GovernorState,
    },

    /// User input rejected before any transaction is sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Configuration file parse error
    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias for eVSD operations
pub type Result<T> = std::result::Result<T, EvsdError>;

/// Error context for retryable operations
#[derive(Debug, Clone, Default)]
pub struct RetryContext {
    /// Number of attempts made
    pub attempts: usize,
    /// Last error encountered
    pub last_error: String,
    /// Total time spent waiting between attempts (in milliseconds)
    pub total_time_ms: u64,
}

impl RetryContext {
    /// Create a new retry context
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed attempt and the delay before the next one
    pub fn record_attempt(&mut self, error: &str, delay_ms: u64) {
        self.attempts += 1;
        self.last_error = error.to_string();
        self.total_time_ms += delay_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EvsdError::UnknownVoteCode(7);
        assert_eq!(err.to_string(), "Unknown vote code: 7");

        let err = EvsdError::InvalidConversion(VoteOption::DidntVote);
        assert!(err.to_string().contains("DidntVote"));
    }

    #[test]
    fn test_source_error_display() {
        let err = EvsdError::Source("connection refused".to_string());
        assert_eq!(err.to_string(), "Contract source error: connection refused");
    }

    #[test]
    fn test_retry_context() {
        let mut ctx = RetryContext::new();
        assert_eq!(ctx.attempts, 0);

        ctx.record_attempt("error 1", 100);
        assert_eq!(ctx.attempts, 1);
        assert_eq!(ctx.last_error, "error 1");
        assert_eq!(ctx.total_time_ms, 100);

        ctx.record_attempt("error 2", 200);
        assert_eq!(ctx.attempts, 2);
        assert_eq!(ctx.last_error, "error 2");
        assert_eq!(ctx.total_time_ms, 300);
    }
}
