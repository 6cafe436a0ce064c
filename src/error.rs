//! Error definitions shared across subsystems.
//!
//! # Taxonomy
//! - `ConnectionError`: a dial to one host failed, or every candidate did
//! - `ConfigurationError`: the caller asked for something unservable
//!   (no candidates, cluster without seeds); never retried automatically
//! - `MetricFetchError`: an RPC failed after the connection was established
//! - `StorageError`: the storage collaborator rejected a read or write
//!
//! Nothing here is fatal to the process. Fan-out paths log and skip.

use std::time::Duration;
use thiserror::Error;

/// Caller-fixable errors; retrying the same call cannot succeed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// `connect_any` was given an empty candidate set.
    #[error("no hosts given for connect_any")]
    NoCandidates,

    /// The cluster has no seed hosts to start from.
    #[error("no seeds in cluster with name: {cluster}")]
    NoSeeds { cluster: String },
}

/// Errors raised while opening a management connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The underlying client refused or failed the dial.
    #[error("failed to connect to {host}: {reason}")]
    Dial { host: String, reason: String },

    /// The dial did not complete within the connection timeout.
    #[error("connection to {host} timed out after {}s", .timeout.as_secs())]
    Timeout { host: String, timeout: Duration },

    /// Both failover passes ran out of candidates.
    #[error("no host could be reached out of {attempted} attempted")]
    Exhausted { attempted: usize },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl ConnectionError {
    /// True when the error is caller-fixable rather than a reachability problem.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ConnectionError::Configuration(_))
    }
}

/// Errors from a metrics RPC on an established connection.
#[derive(Debug, Error)]
pub enum MetricFetchError {
    #[error("RPC to {host} failed: {reason}")]
    Rpc { host: String, reason: String },

    #[error("RPC to {host} timed out")]
    Timeout { host: String },

    #[error("connection to {host} is closed")]
    Closed { host: String },
}

/// Errors surfaced by the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;
pub type FetchResult<T> = Result<T, MetricFetchError>;
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConnectionError::Timeout {
            host: "10.0.0.1".into(),
            timeout: Duration::from_secs(20),
        };
        assert_eq!(err.to_string(), "connection to 10.0.0.1 timed out after 20s");

        let err: ConnectionError = ConfigurationError::NoSeeds { cluster: "prod".into() }.into();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "no seeds in cluster with name: prod");
    }
}
