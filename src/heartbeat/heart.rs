//! Rate-limited liveness heartbeat.
//!
//! # States
//! - Idle: waiting for the next qualifying `beat()`
//! - Beating: marker being persisted, sweep possibly being triggered
//!
//! # State Transitions
//! ```text
//! Idle → Beating: storage supports coordination AND interval elapsed
//! Beating → Idle: implicit; the next call re-evaluates the guard
//! ```
//!
//! # Design Decisions
//! - The last-beat time is claimed before persisting so a burst of callers
//!   produces one beat
//! - A failed save is logged and counted; the next qualifying tick retries
//! - The metrics sweep is detached; `beat()` only reports whether one started

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::config::{DatacenterAvailability, HeartbeatConfig};
use crate::heartbeat::fanout::{MetricsFanout, SweepHandle};
use crate::observability::metrics;
use crate::storage::Storage;

/// Result of one `beat()` call.
#[derive(Debug)]
pub enum BeatOutcome {
    /// The storage backend cannot coordinate instances; nothing to do.
    Uncoordinated,
    /// Less than the heartbeat interval has passed since the last beat.
    TooSoon,
    /// The marker was persisted. `sweep` is set if a metrics sweep started.
    Saved { sweep: Option<SweepHandle> },
    /// Persisting the marker failed.
    Failed,
}

impl BeatOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, BeatOutcome::Saved { .. })
    }

    /// Take the sweep handle, if a sweep was started.
    pub fn into_sweep(self) -> Option<SweepHandle> {
        match self {
            BeatOutcome::Saved { sweep } => sweep,
            _ => None,
        }
    }
}

/// Emits the liveness marker consumed by peer instances.
pub struct Heartbeat {
    storage: Arc<dyn Storage>,
    fanout: MetricsFanout,
    availability: DatacenterAvailability,
    interval: Duration,
    instance_id: Uuid,
    last_beat: Mutex<Option<Instant>>,
}

impl Heartbeat {
    pub fn new(storage: Arc<dyn Storage>, fanout: MetricsFanout, config: &HeartbeatConfig) -> Self {
        Self {
            storage,
            fanout,
            availability: config.datacenter_availability,
            interval: config.effective_interval(),
            instance_id: Uuid::new_v4(),
            last_beat: Mutex::new(None),
        }
    }

    pub fn with_instance_id(mut self, instance_id: Uuid) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_beat(&self) -> Option<Instant> {
        *self.last_beat.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn fanout(&self) -> &MetricsFanout {
        &self.fanout
    }

    /// Persist the liveness marker if due, and start a metrics sweep when the
    /// availability mode needs per-node metrics.
    pub async fn beat(&self) -> BeatOutcome {
        let Some(storage) = self.storage.as_distributed() else {
            return BeatOutcome::Uncoordinated;
        };
        if !self.claim() {
            return BeatOutcome::TooSoon;
        }

        if let Err(e) = storage.save_heartbeat(self.instance_id).await {
            tracing::warn!(instance_id = %self.instance_id, error = %e, "Failed to save heartbeat");
            metrics::record_heartbeat("failed");
            return BeatOutcome::Failed;
        }
        metrics::record_heartbeat("saved");
        tracing::debug!(instance_id = %self.instance_id, "Heartbeat saved");

        let sweep = if self.availability.tracks_node_metrics() {
            self.fanout.trigger()
        } else {
            None
        };
        BeatOutcome::Saved { sweep }
    }

    /// Cancel any in-flight sweep. Later beats still persist the marker.
    pub fn close(&self) {
        self.fanout.close();
    }

    /// Record `now` as the last beat if the interval has elapsed.
    fn claim(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_beat.lock().unwrap_or_else(|p| p.into_inner());
        match *last {
            Some(prev) if now.duration_since(prev) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, ConnectionFactory, ConnectionTarget, Credentials, ManagementClient, ProgressHandler};
    use crate::error::{ConnectionError, ConnectionResult, StorageError, StorageResult};
    use crate::storage::{Cluster, DistributedStorage, MemoryStorage, NodeMetrics};
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl ManagementClient for Unreachable {
        async fn dial(
            &self,
            target: &ConnectionTarget,
            _credentials: Option<&Credentials>,
            _timeout: Duration,
            _handler: Option<Arc<dyn ProgressHandler>>,
        ) -> ConnectionResult<Connection> {
            Err(ConnectionError::Dial {
                host: target.host.clone(),
                reason: "unreachable".into(),
            })
        }
    }

    fn heartbeat(storage: Arc<dyn Storage>, availability: DatacenterAvailability) -> Heartbeat {
        let factory = Arc::new(ConnectionFactory::new(Arc::new(Unreachable)));
        let fanout = MetricsFanout::new(factory, storage.clone(), 4, Duration::from_secs(1));
        let config = HeartbeatConfig {
            datacenter_availability: availability,
            ..Default::default()
        };
        Heartbeat::new(storage, fanout, &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_beat_is_rate_limited() {
        let storage = Arc::new(MemoryStorage::distributed());
        let heart = heartbeat(storage.clone(), DatacenterAvailability::All);

        assert!(heart.beat().await.is_saved());
        assert!(matches!(heart.beat().await, BeatOutcome::TooSoon));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(matches!(heart.beat().await, BeatOutcome::TooSoon));
        assert_eq!(storage.heartbeats().len(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(heart.beat().await.is_saved());
        assert_eq!(storage.heartbeats().len(), 2);
        assert!(storage.heartbeats().iter().all(|b| b.instance_id == heart.instance_id()));
    }

    #[tokio::test]
    async fn test_uncoordinated_storage_never_beats() {
        let storage = Arc::new(MemoryStorage::new());
        let heart = heartbeat(storage, DatacenterAvailability::Each);

        assert!(matches!(heart.beat().await, BeatOutcome::Uncoordinated));
        assert!(heart.last_beat().is_none());
    }

    #[tokio::test]
    async fn test_sweep_only_in_each_mode() {
        let storage = Arc::new(MemoryStorage::distributed());
        storage.add_cluster(Cluster::new("prod", ["10.0.0.1"]));

        let heart = heartbeat(storage.clone(), DatacenterAvailability::Local);
        assert!(heart.beat().await.into_sweep().is_none());

        let heart = heartbeat(storage, DatacenterAvailability::Each);
        let sweep = heart.beat().await.into_sweep().expect("sweep should start");
        assert!(sweep.join().await);
    }

    #[tokio::test]
    async fn test_concurrent_callers_beat_once() {
        let storage = Arc::new(MemoryStorage::distributed());
        let heart = Arc::new(heartbeat(storage.clone(), DatacenterAvailability::All));

        let mut set = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let heart = heart.clone();
            set.spawn(async move { heart.beat().await.is_saved() });
        }
        let mut saved = 0;
        while let Some(res) = set.join_next().await {
            if res.unwrap() {
                saved += 1;
            }
        }
        assert_eq!(saved, 1);
        assert_eq!(storage.heartbeats().len(), 1);
    }

    struct FailingStorage;

    #[async_trait]
    impl Storage for FailingStorage {
        async fn list_clusters(&self) -> StorageResult<Vec<Cluster>> {
            Ok(Vec::new())
        }
        fn as_distributed(&self) -> Option<&dyn DistributedStorage> {
            Some(self)
        }
    }

    #[async_trait]
    impl DistributedStorage for FailingStorage {
        async fn save_heartbeat(&self, _instance_id: Uuid) -> StorageResult<()> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn list_node_metrics(&self) -> StorageResult<Vec<NodeMetrics>> {
            Ok(Vec::new())
        }
        async fn store_node_metrics(&self, _metrics: NodeMetrics) -> StorageResult<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_is_isolated() {
        let heart = heartbeat(Arc::new(FailingStorage), DatacenterAvailability::Each);

        assert!(matches!(heart.beat().await, BeatOutcome::Failed));
        assert!(matches!(heart.beat().await, BeatOutcome::TooSoon));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(matches!(heart.beat().await, BeatOutcome::Failed));
    }
}
