//! In-process storage backend.

use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::storage::types::{Cluster, NodeMetrics};
use crate::storage::{DistributedStorage, Storage};

/// A recorded heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatRecord {
    pub instance_id: Uuid,
    pub at: SystemTime,
}

/// Thread-safe storage held entirely in memory.
///
/// Built with [`MemoryStorage::distributed`] it also exposes the
/// distributed-coordination capability.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    distributed: bool,
    clusters: DashMap<String, Cluster>,
    node_metrics: DashMap<String, NodeMetrics>,
    heartbeats: Mutex<Vec<HeartbeatRecord>>,
}

impl MemoryStorage {
    /// Single-instance storage without coordination support.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distributed() -> Self {
        Self {
            distributed: true,
            ..Self::default()
        }
    }

    pub fn add_cluster(&self, cluster: Cluster) {
        self.clusters.insert(cluster.name.clone(), cluster);
    }

    pub fn node_metrics(&self, host: &str) -> Option<NodeMetrics> {
        self.node_metrics.get(host).map(|r| r.value().clone())
    }

    pub fn heartbeats(&self) -> Vec<HeartbeatRecord> {
        self.heartbeats
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn list_clusters(&self) -> StorageResult<Vec<Cluster>> {
        Ok(self.clusters.iter().map(|r| r.value().clone()).collect())
    }

    fn as_distributed(&self) -> Option<&dyn DistributedStorage> {
        if self.distributed {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl DistributedStorage for MemoryStorage {
    async fn save_heartbeat(&self, instance_id: Uuid) -> StorageResult<()> {
        let record = HeartbeatRecord {
            instance_id,
            at: SystemTime::now(),
        };
        match self.heartbeats.lock() {
            Ok(mut heartbeats) => heartbeats.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        Ok(())
    }

    async fn list_node_metrics(&self) -> StorageResult<Vec<NodeMetrics>> {
        Ok(self.node_metrics.iter().map(|r| r.value().clone()).collect())
    }

    async fn store_node_metrics(&self, metrics: NodeMetrics) -> StorageResult<()> {
        self.node_metrics.insert(metrics.host_address.clone(), metrics);
        Ok(())
    }
}
