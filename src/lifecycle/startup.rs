//! Startup orchestration.
//!
//! # Responsibilities
//! - Install logging and the optional metrics exporter
//! - Wire the connection factory, metrics fan-out and heartbeat together
//! - Start the config watcher and the heartbeat driver
//!
//! # Design Decisions
//! - The management client and storage are supplied by the embedding
//!   process; this crate never opens sockets of its own
//! - Subsystems initialize in dependency order, not concurrently

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use crate::config::{AppConfig, ConnectionConfig, ConnectionWatcher, ObservabilityConfig};
use crate::connection::{ConnectionFactory, ConnectionSettings, ManagementClient};
use crate::heartbeat::{Heartbeat, MetricsFanout};
use crate::lifecycle::driver::{DriverHandle, HeartbeatDriver};
use crate::observability::{logging, metrics};
use crate::storage::Storage;

/// The long-lived services built from one configuration.
#[derive(Clone)]
pub struct Services {
    pub factory: Arc<ConnectionFactory>,
    pub heart: Arc<Heartbeat>,
    pub tick: Duration,
}

impl Services {
    /// Spawn the heartbeat driver, applying `updates` as they arrive.
    pub fn spawn_driver(&self, updates: Option<mpsc::UnboundedReceiver<ConnectionConfig>>) -> DriverHandle {
        HeartbeatDriver::new(self.heart.clone(), self.factory.clone(), self.tick).spawn(updates)
    }
}

/// Build the connection factory and heartbeat for `config`.
pub fn build_services(
    config: &AppConfig,
    client: Arc<dyn ManagementClient>,
    storage: Arc<dyn Storage>,
) -> Services {
    let factory = Arc::new(ConnectionFactory::new(client));
    factory.apply_settings(ConnectionSettings::from_config(&config.connection));

    let fanout = MetricsFanout::new(
        factory.clone(),
        storage.clone(),
        config.heartbeat.worker_pool_size,
        config.connection.timeout(),
    );
    let heart = Arc::new(Heartbeat::new(storage, fanout, &config.heartbeat));

    tracing::info!(
        instance_id = %heart.instance_id(),
        local_mode = config.connection.local_mode,
        timeout_secs = config.connection.timeout_secs,
        interval_secs = heart.interval().as_secs(),
        availability = ?config.heartbeat.datacenter_availability,
        worker_pool_size = config.heartbeat.worker_pool_size,
        "Liveness services initialized"
    );

    Services {
        factory,
        heart,
        tick: config.heartbeat.tick(),
    }
}

/// Watch `path` for connection changes relative to `config`.
///
/// The returned watcher must be kept alive; the receiver feeds
/// [`Services::spawn_driver`].
pub fn watch_connection_config(
    path: &Path,
    config: &AppConfig,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<ConnectionConfig>), notify::Error> {
    let (watcher, updates) = ConnectionWatcher::new(path, config.connection.clone());
    Ok((watcher.watch()?, updates))
}

/// Install logging, then the metrics exporter if enabled.
pub fn init_observability(config: &ObservabilityConfig) {
    if let Err(e) = logging::init_logging(config) {
        eprintln!("logging already initialized: {e}");
    }

    if config.metrics_enabled {
        match config.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }
}
