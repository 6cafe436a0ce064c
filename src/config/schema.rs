//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shortest interval allowed between two persisted heartbeats.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Management connection settings.
    pub connection: ConnectionConfig,

    /// Heartbeat and metrics fan-out settings.
    pub heartbeat: HeartbeatConfig,

    /// Logging and metrics exposition.
    pub observability: ObservabilityConfig,
}

/// Management connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Dial every host on the loopback address (single-process deployments).
    pub local_mode: bool,

    /// Per-connection timeout in seconds.
    pub timeout_secs: u64,

    /// Management port overrides keyed by host identifier.
    pub ports: HashMap<String, u16>,

    /// Optional credentials; connections are unauthenticated without them.
    pub credentials: Option<CredentialsConfig>,

    /// Address translation handed to the connection client.
    pub address_translation: AddressTranslationConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            local_mode: false,
            timeout_secs: 20,
            ports: HashMap::new(),
            credentials: None,
            address_translation: AddressTranslationConfig::default(),
        }
    }
}

impl ConnectionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CredentialsConfig {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AddressTranslationConfig {
    /// Enable translation of advertised addresses.
    pub enabled: bool,

    /// Advertised address → reachable address.
    pub mappings: HashMap<String, String>,
}

/// How much per-node reachability awareness the deployment needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatacenterAvailability {
    /// Every node is reachable from every instance.
    #[default]
    All,
    /// Instances only reach their local datacenter.
    Local,
    /// Each datacenter is independently reachable; node metrics are shared
    /// through storage so peers can coordinate.
    Each,
}

impl DatacenterAvailability {
    /// True when heartbeats must also refresh per-node metrics.
    pub fn tracks_node_metrics(self) -> bool {
        self == DatacenterAvailability::Each
    }
}

/// Heartbeat configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Minimum seconds between persisted heartbeats (floored at 60).
    pub interval_secs: u64,

    /// Seconds between driver ticks calling `beat()`.
    pub tick_secs: u64,

    /// Node-availability mode.
    pub datacenter_availability: DatacenterAvailability,

    /// Maximum concurrent fan-out tasks.
    pub worker_pool_size: usize,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            tick_secs: 10,
            datacenter_availability: DatacenterAvailability::default(),
            worker_pool_size: 256,
        }
    }
}

impl HeartbeatConfig {
    /// Configured interval, never shorter than [`MIN_HEARTBEAT_INTERVAL`].
    pub fn effective_interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs).max(MIN_HEARTBEAT_INTERVAL)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9464".to_string(),
        }
    }
}
