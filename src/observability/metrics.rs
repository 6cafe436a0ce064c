//! Metrics collection and exposition.
//!
//! # Metrics
//! - `liveness_fanout_running_workers` (gauge): pool tasks alive
//! - `liveness_fanout_active_workers` (gauge): pool tasks holding a worker slot
//! - `liveness_fanout_queued_tasks` (gauge): pool tasks waiting for a slot
//! - `liveness_fanout_queued_submissions` (gauge): sweeps outstanding
//! - `liveness_host_connection_score` (gauge): per-host failover score
//! - `liveness_heartbeats_total` (counter): beats by result
//! - `liveness_metrics_*_duration_seconds` (histogram): sweep timings

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const RUNNING_WORKERS: &str = "liveness_fanout_running_workers";
pub const ACTIVE_WORKERS: &str = "liveness_fanout_active_workers";
pub const QUEUED_TASKS: &str = "liveness_fanout_queued_tasks";
pub const QUEUED_SUBMISSIONS: &str = "liveness_fanout_queued_submissions";

static POOL_GAUGES_REGISTERED: AtomicBool = AtomicBool::new(false);

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Describe the fan-out pool gauges. Only the first call has any effect.
///
/// Returns true for the call that performed the registration.
pub fn register_pool_gauges() -> bool {
    if !claim_once(&POOL_GAUGES_REGISTERED) {
        return false;
    }

    describe_gauge!(RUNNING_WORKERS, "Fan-out tasks currently alive");
    describe_gauge!(ACTIVE_WORKERS, "Fan-out tasks currently holding a worker slot");
    describe_gauge!(QUEUED_TASKS, "Fan-out tasks waiting for a worker slot");
    describe_gauge!(QUEUED_SUBMISSIONS, "Metrics sweeps submitted and not yet finished");
    describe_gauge!("liveness_host_connection_score", "Signed connection success score per host");
    describe_counter!("liveness_heartbeats_total", "Heartbeats attempted, by result");
    describe_histogram!("liveness_metrics_sweep_duration_seconds", "Duration of a full metrics sweep");
    describe_histogram!("liveness_metrics_cluster_duration_seconds", "Duration of one cluster's sweep");
    describe_histogram!("liveness_metrics_node_duration_seconds", "Duration of one node's metrics refresh");
    true
}

/// True for exactly one caller per `flag`.
fn claim_once(flag: &AtomicBool) -> bool {
    flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

/// Publish the fan-out pool counters.
pub fn record_pool_state(running: usize, active: usize, queued_tasks: usize, queued_submissions: usize) {
    gauge!(RUNNING_WORKERS).set(running as f64);
    gauge!(ACTIVE_WORKERS).set(active as f64);
    gauge!(QUEUED_TASKS).set(queued_tasks as f64);
    gauge!(QUEUED_SUBMISSIONS).set(queued_submissions as f64);
}

pub fn record_host_score(host: &str, score: i64) {
    gauge!("liveness_host_connection_score", "host" => host.to_string()).set(score as f64);
}

pub fn record_heartbeat(result: &'static str) {
    counter!("liveness_heartbeats_total", "result" => result).increment(1);
}

pub fn record_sweep_duration(elapsed: Duration) {
    histogram!("liveness_metrics_sweep_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_cluster_duration(cluster: &str, elapsed: Duration) {
    histogram!("liveness_metrics_cluster_duration_seconds", "cluster" => cluster.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_node_duration(cluster: &str, elapsed: Duration) {
    histogram!("liveness_metrics_node_duration_seconds", "cluster" => cluster.to_string())
        .record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_claim_once_across_threads() {
        let flag = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flag = flag.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    claim_once(&flag)
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(!claim_once(&flag));
    }

    #[test]
    fn test_pool_gauges_register_once() {
        // Earlier sweeps in this process may already have registered.
        register_pool_gauges();
        assert!(!register_pool_gauges());
        assert!(POOL_GAUGES_REGISTERED.load(Ordering::Acquire));
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_pool_state(1, 1, 0, 1);
        record_host_score("10.0.0.1", -3);
        record_heartbeat("saved");
    }
}
