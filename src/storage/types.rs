//! Cluster and node metric records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A managed cluster, reached through its seed hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub seed_hosts: BTreeSet<String>,
}

impl Cluster {
    pub fn new<S>(name: impl Into<String>, seeds: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            seed_hosts: seeds.into_iter().map(Into::into).collect(),
        }
    }
}

/// Point-in-time metrics for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub host_address: String,
    pub datacenter: String,
    pub pending_compactions: u64,
    pub has_repair_running: bool,
    /// Reserved; always zero when produced by the metrics sweep.
    pub active_anticompactions: u32,
}

impl NodeMetrics {
    pub fn new(
        host_address: impl Into<String>,
        datacenter: impl Into<String>,
        pending_compactions: u64,
        has_repair_running: bool,
    ) -> Self {
        Self {
            host_address: host_address.into(),
            datacenter: datacenter.into(),
            pending_compactions,
            has_repair_running,
            active_anticompactions: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_seeds_are_deduplicated() {
        let cluster = Cluster::new("prod", ["10.0.0.2", "10.0.0.1", "10.0.0.2"]);
        assert_eq!(cluster.seed_hosts.len(), 2);
    }

    #[test]
    fn test_node_metrics_serialization() {
        let metrics = NodeMetrics::new("10.0.0.1", "dc1", 12, true);
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["host_address"], "10.0.0.1");
        assert_eq!(json["active_anticompactions"], 0);
    }
}
