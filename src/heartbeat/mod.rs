//! Liveness heartbeat and node metrics fan-out.
//!
//! # Data Flow
//! ```text
//! HeartbeatDriver tick
//!     → Heartbeat::beat (heart.rs)
//!         → elapsed-time guard (≥ interval since last beat)
//!         → DistributedStorage::save_heartbeat
//!         → if datacenter availability is EACH: MetricsFanout::trigger
//!
//! MetricsFanout sweep (fanout.rs), detached from the caller:
//!     → baseline = hosts already in stored node metrics
//!     → per cluster (parallel): seed connect_any → live nodes
//!         → per selected node (parallel, pool.rs): connect → fetch → store
//! ```
//!
//! # Design Decisions
//! - `beat()` never waits for the sweep; it hands back a handle instead
//! - At most one sweep is in flight; extra triggers are dropped
//! - Worker slots are only held by leaf work (dials and RPCs), never by a
//!   task waiting on other pool tasks, so the pool cannot starve itself
//! - Every failure below the sweep is logged and isolated to its node or cluster

pub mod fanout;
pub mod heart;
pub mod pool;

pub use fanout::{MetricsFanout, SweepHandle};
pub use heart::{BeatOutcome, Heartbeat};
pub use pool::{PoolSnapshot, WorkerPool};
