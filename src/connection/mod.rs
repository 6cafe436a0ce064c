//! Management connection subsystem.
//!
//! # Data Flow
//! ```text
//! connect(host):
//!     → resolver.rs (local mode, port map → dial address)
//!     → client.rs ManagementClient::dial (credentials, translator, timeout)
//!     → health tracker updated with the outcome
//!
//! connect_any(candidates):
//!     → shuffle
//!     → pass 1: preferred hosts only (score >= 0)
//!     → pass 2: every host pass 1 skipped
//!     → first success wins; every failure lowers that host's score
//! ```
//!
//! # Design Decisions
//! - The wire protocol is a capability (`ManagementClient`), not implemented here
//! - Address translation is applied by the client; the resolver only passes it on
//! - Settings are swapped atomically so reloads never tear an in-flight dial

pub mod client;
pub mod factory;
pub mod resolver;
pub mod target;

pub use client::{Connection, ManagementClient, ManagementConnection, ProgressEvent, ProgressHandler};
pub use factory::{ConnectionFactory, ConnectionSettings};
pub use resolver::{resolve_address, LOOPBACK};
pub use target::{AddressTranslator, ConnectionTarget, Credentials, MappedAddressTranslator};
