//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (gauges, counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every log event carries host/cluster fields, not interpolated strings
//! - Metric updates are cheap and safe to call without an installed recorder
//! - Fan-out pool gauges are described exactly once per process

pub mod logging;
pub mod metrics;
