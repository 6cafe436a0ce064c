//! Host health subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectionFactory dial attempt
//!     → success: tracker.record_success(host)   (score += 1)
//!     → failure: tracker.record_failure(host)   (score -= 1)
//!
//! connect_any pass 1
//!     → tracker.is_preferred(host)  (score >= 0)
//! ```
//!
//! # Design Decisions
//! - Scores are signed and never clamped, reset or decayed
//! - Only the sign is used for selection; magnitude is advisory
//! - Process-local: the tracker is local history, not cluster-wide truth
//! - A negative score never blacklists; pass 2 of failover still tries the host

pub mod tracker;

pub use tracker::HostHealthTracker;
