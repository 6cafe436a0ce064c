//! Storage capability consumed by the heartbeat.
//!
//! # Data Flow
//! ```text
//! Heartbeat.beat()
//!     → DistributedStorage::save_heartbeat (liveness marker)
//!
//! MetricsFanout sweep
//!     → DistributedStorage::list_node_metrics (baseline)
//!     → Storage::list_clusters
//!     → DistributedStorage::store_node_metrics (one per refreshed node)
//! ```
//!
//! # Design Decisions
//! - Persistence is a collaborator; this crate only consumes the traits
//! - Distributed coordination is an optional capability discovered at runtime
//! - Node metrics are stored with overwrite semantics, no history

pub mod memory;
pub mod types;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageResult;

pub use memory::MemoryStorage;
pub use types::{Cluster, NodeMetrics};

/// Read access to the clusters under management.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn list_clusters(&self) -> StorageResult<Vec<Cluster>>;

    /// The distributed-coordination capability, if this backend has one.
    fn as_distributed(&self) -> Option<&dyn DistributedStorage> {
        None
    }
}

/// Storage shared between cooperating instances.
#[async_trait]
pub trait DistributedStorage: Send + Sync {
    /// Persist "instance is alive as of now".
    async fn save_heartbeat(&self, instance_id: Uuid) -> StorageResult<()>;

    async fn list_node_metrics(&self) -> StorageResult<Vec<NodeMetrics>>;

    /// Overwrite the stored metrics for `metrics.host_address`.
    async fn store_node_metrics(&self, metrics: NodeMetrics) -> StorageResult<()>;
}
