//! Liveness and connection-failover core for a repair coordinator.
//!
//! # Architecture Overview
//!
//! ```text
//!   HeartbeatDriver ──tick──▶ Heartbeat ──save──▶ DistributedStorage
//!                                 │
//!                                 ▼ (datacenter_availability = each)
//!                            MetricsFanout ──▶ WorkerPool (bounded, gauged)
//!                                 │
//!                                 ▼
//!                          ConnectionFactory ──▶ ManagementClient
//!                                 │
//!                                 ▼
//!                          HostHealthTracker
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod health;
pub mod heartbeat;
pub mod lifecycle;
pub mod observability;
pub mod storage;

pub use config::AppConfig;
pub use connection::ConnectionFactory;
pub use health::HostHealthTracker;
pub use heartbeat::{Heartbeat, MetricsFanout};
pub use lifecycle::{build_services, DriverHandle, Services};
