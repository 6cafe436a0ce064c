//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check that enabled features carry the data they need
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::schema::AppConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("connection.timeout_secs must be greater than zero")]
    ZeroConnectionTimeout,

    #[error("connection.ports.{host} must not be zero")]
    ZeroPort { host: String },

    #[error("connection.credentials.username must not be empty")]
    EmptyUsername,

    #[error("connection.address_translation is enabled but has no mappings")]
    EmptyTranslation,

    #[error("heartbeat.tick_secs must be greater than zero")]
    ZeroTick,

    #[error("heartbeat.worker_pool_size must be greater than zero")]
    ZeroPoolSize,

    #[error("heartbeat.worker_pool_size must not exceed {max}")]
    PoolSizeTooLarge { max: usize },

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let conn = &config.connection;

    if conn.timeout_secs == 0 {
        errors.push(ValidationError::ZeroConnectionTimeout);
    }

    let mut zero_ports: Vec<_> = conn
        .ports
        .iter()
        .filter(|(_, port)| **port == 0)
        .map(|(host, _)| host.clone())
        .collect();
    zero_ports.sort();
    errors.extend(zero_ports.into_iter().map(|host| ValidationError::ZeroPort { host }));

    if let Some(creds) = &conn.credentials {
        if creds.username.trim().is_empty() {
            errors.push(ValidationError::EmptyUsername);
        }
    }

    if conn.address_translation.enabled && conn.address_translation.mappings.is_empty() {
        errors.push(ValidationError::EmptyTranslation);
    }

    if config.heartbeat.tick_secs == 0 {
        errors.push(ValidationError::ZeroTick);
    }

    match config.heartbeat.worker_pool_size {
        0 => errors.push(ValidationError::ZeroPoolSize),
        size if size > Semaphore::MAX_PERMITS => errors.push(ValidationError::PoolSizeTooLarge {
            max: Semaphore::MAX_PERMITS,
        }),
        _ => {}
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
