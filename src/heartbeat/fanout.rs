//! Fleet-wide node metrics sweep.
//!
//! # Responsibilities
//! - Connect to one seed per cluster and enumerate its live nodes
//! - Connect to each selected node, fetch its metrics and persist them
//! - Isolate failures: a bad node skips that node, a bad seed skips that cluster
//!
//! # Node selection
//! A live node is refreshed when its host score is nonnegative and it is
//! already present in the cluster's working set, which starts as the set of
//! hosts with stored metrics. Nodes seen for the first time are added to the
//! working set but not measured in that sweep.
//! TODO: confirm with product whether first-seen nodes should be measured
//! immediately; until then the selection stays as is.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant};

use crate::connection::{ConnectionFactory, ManagementConnection};
use crate::error::{ConnectionError, FetchResult, MetricFetchError, StorageError};
use crate::heartbeat::pool::{PoolSnapshot, WorkerPool};
use crate::observability::metrics;
use crate::storage::{Cluster, NodeMetrics, Storage};

#[derive(Debug, Error)]
enum SweepError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Fetch(#[from] MetricFetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Handle to a detached sweep.
///
/// Dropping the handle leaves the sweep running. Closing or dropping the
/// owning [`MetricsFanout`] aborts it.
#[derive(Debug)]
pub struct SweepHandle {
    inner: JoinHandle<()>,
}

impl SweepHandle {
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the sweep to finish. Returns false if it was cancelled.
    pub async fn join(self) -> bool {
        self.inner.await.is_ok()
    }
}

struct FanoutContext {
    factory: Arc<ConnectionFactory>,
    storage: Arc<dyn Storage>,
    pool: WorkerPool,
    timeout: Duration,
}

/// Runs metrics sweeps on a bounded worker pool.
pub struct MetricsFanout {
    ctx: Arc<FanoutContext>,
}

impl MetricsFanout {
    pub fn new(
        factory: Arc<ConnectionFactory>,
        storage: Arc<dyn Storage>,
        pool_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            ctx: Arc::new(FanoutContext {
                factory,
                storage,
                pool: WorkerPool::new(pool_size),
                timeout,
            }),
        }
    }

    /// Start a sweep unless one is already in flight or the runner is closed.
    pub fn trigger(&self) -> Option<SweepHandle> {
        metrics::register_pool_gauges();

        let ctx = self.ctx.clone();
        match self.ctx.pool.try_submit(sweep(ctx)) {
            Some(inner) => Some(SweepHandle { inner }),
            None => {
                tracing::debug!("Metrics sweep already in flight, skipping");
                None
            }
        }
    }

    pub fn pool_snapshot(&self) -> PoolSnapshot {
        self.ctx.pool.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.ctx.pool.is_closed()
    }

    /// Discard queued and in-flight sweep work.
    ///
    /// Connections held by aborted tasks are dropped, not closed.
    pub fn close(&self) {
        self.ctx.pool.close();
    }
}

impl Drop for MetricsFanout {
    fn drop(&mut self) {
        self.close();
    }
}

async fn sweep(ctx: Arc<FanoutContext>) {
    let started = Instant::now();

    let Some(storage) = ctx.storage.as_distributed() else {
        tracing::warn!("Storage has no coordination support, skipping metrics sweep");
        return;
    };

    let baseline: HashSet<String> = match storage.list_node_metrics().await {
        Ok(stored) => stored.into_iter().map(|m| m.host_address).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read stored node metrics");
            return;
        }
    };
    let clusters = match ctx.storage.list_clusters().await {
        Ok(clusters) => clusters,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list clusters");
            return;
        }
    };

    let baseline = Arc::new(baseline);
    let mut sweeps = JoinSet::new();
    for cluster in clusters {
        let ctx = ctx.clone();
        let baseline = baseline.clone();
        sweeps.spawn(async move { refresh_cluster(ctx, cluster, baseline).await });
    }
    while let Some(joined) = sweeps.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                tracing::error!(error = %e, "Cluster metrics sweep panicked");
            }
        }
    }

    metrics::record_sweep_duration(started.elapsed());
    tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Metrics sweep finished");
}

async fn refresh_cluster(ctx: Arc<FanoutContext>, cluster: Cluster, baseline: Arc<HashSet<String>>) {
    let started = Instant::now();

    let live_nodes = match ctx.pool.run(seed_live_nodes(&ctx, &cluster)).await {
        None => return,
        Some(Ok(nodes)) => nodes,
        Some(Err(e)) => {
            tracing::warn!(cluster = %cluster.name, error = %e, "Failed seed connection");
            metrics::record_cluster_duration(&cluster.name, started.elapsed());
            return;
        }
    };

    let mut updated: HashSet<String> = HashSet::clone(&baseline);
    let selected: Vec<String> = live_nodes
        .into_iter()
        .filter(|node| ctx.factory.health().is_preferred(node))
        .filter(|node| !updated.insert(node.clone()))
        .collect();

    let mut nodes = JoinSet::new();
    for node in selected {
        let task_ctx = ctx.clone();
        let cluster_name = cluster.name.clone();
        ctx.pool.spawn(&mut nodes, async move {
            refresh_node(&task_ctx, &cluster_name, &node).await;
        });
    }
    while nodes.join_next().await.is_some() {}

    let mut updated: Vec<String> = updated.into_iter().collect();
    updated.sort();
    tracing::info!(
        cluster = %cluster.name,
        nodes = %updated.join(","),
        "Updated metrics in cluster"
    );
    metrics::record_cluster_duration(&cluster.name, started.elapsed());
}

async fn seed_live_nodes(ctx: &FanoutContext, cluster: &Cluster) -> Result<Vec<String>, SweepError> {
    let seed = ctx.factory.connect_cluster(cluster, ctx.timeout).await?;
    let nodes = with_deadline(seed.host(), ctx.timeout, seed.list_live_nodes()).await;
    seed.close().await;
    Ok(nodes?)
}

async fn refresh_node(ctx: &FanoutContext, cluster: &str, node: &str) {
    let started = Instant::now();
    match store_node_metrics(ctx, node).await {
        Ok(stored) => tracing::debug!(
            host = %node,
            cluster = %cluster,
            pending_compactions = stored.pending_compactions,
            repair_running = stored.has_repair_running,
            "Stored node metrics"
        ),
        Err(e) => tracing::warn!(host = %node, cluster = %cluster, error = %e, "Failed node metrics update"),
    }
    metrics::record_node_duration(cluster, started.elapsed());
}

async fn store_node_metrics(ctx: &FanoutContext, node: &str) -> Result<NodeMetrics, SweepError> {
    let storage = ctx
        .storage
        .as_distributed()
        .ok_or_else(|| StorageError::Unavailable("no coordination support".into()))?;

    let conn = ctx.factory.connect(node, ctx.timeout, None).await?;
    let fetched = with_deadline(node, ctx.timeout, fetch_node_metrics(conn.as_ref(), node)).await;
    conn.close().await;

    let node_metrics = fetched?;
    storage.store_node_metrics(node_metrics.clone()).await?;
    Ok(node_metrics)
}

async fn fetch_node_metrics(conn: &dyn ManagementConnection, node: &str) -> FetchResult<NodeMetrics> {
    let datacenter = conn.datacenter().await?;
    let pending_compactions = conn.pending_compactions().await?;
    let has_repair_running = conn.is_repair_running().await?;
    Ok(NodeMetrics::new(node, datacenter, pending_compactions, has_repair_running))
}

async fn with_deadline<T>(
    host: &str,
    timeout: Duration,
    rpc: impl std::future::Future<Output = FetchResult<T>>,
) -> FetchResult<T> {
    match time::timeout(timeout, rpc).await {
        Ok(result) => result,
        Err(_) => Err(MetricFetchError::Timeout { host: host.to_string() }),
    }
}
