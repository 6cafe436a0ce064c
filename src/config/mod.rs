//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → connection settings swapped into ConnectionFactory
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → [connection] compared with the last forwarded section
//!     → HeartbeatDriver applies the new connection settings
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only connection settings hot-reload; heartbeat cadence and pool size
//!   are fixed for the life of the process

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::AppConfig;
pub use schema::ConnectionConfig;
pub use schema::CredentialsConfig;
pub use schema::AddressTranslationConfig;
pub use schema::DatacenterAvailability;
pub use schema::HeartbeatConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use watcher::{ConnectionWatcher, ReloadOutcome};
