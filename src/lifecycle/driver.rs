//! Periodic heartbeat driver.
//!
//! # Responsibilities
//! - Call `Heartbeat::beat()` on every tick; the heartbeat rate-limits itself
//! - Apply reloaded connection settings to the factory
//! - Close the heartbeat on stop so in-flight sweeps are cancelled

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::ConnectionConfig;
use crate::connection::{ConnectionFactory, ConnectionSettings};
use crate::heartbeat::{BeatOutcome, Heartbeat};

pub struct HeartbeatDriver {
    heart: Arc<Heartbeat>,
    factory: Arc<ConnectionFactory>,
    tick: Duration,
}

/// Handle to a spawned driver.
///
/// Dropping the handle also stops the driver.
#[derive(Debug)]
pub struct DriverHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the driver and wait for it to close the heartbeat.
    ///
    /// Returns false if the driver task panicked.
    pub async fn stop(self) -> bool {
        let _ = self.stop.send(());
        match self.task.await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Heartbeat driver task failed");
                false
            }
        }
    }
}

impl HeartbeatDriver {
    pub fn new(heart: Arc<Heartbeat>, factory: Arc<ConnectionFactory>, tick: Duration) -> Self {
        Self {
            heart,
            factory,
            tick: tick.max(Duration::from_secs(1)),
        }
    }

    /// Run the driver on its own task.
    pub fn spawn(self, updates: Option<mpsc::UnboundedReceiver<ConnectionConfig>>) -> DriverHandle {
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(self.run(stopped, updates));
        DriverHandle { stop, task }
    }

    /// Tick until `stop` fires or its sender is dropped.
    pub async fn run(
        self,
        mut stop: oneshot::Receiver<()>,
        mut updates: Option<mpsc::UnboundedReceiver<ConnectionConfig>>,
    ) {
        tracing::info!(
            tick_secs = self.tick.as_secs(),
            instance_id = %self.heart.instance_id(),
            "Heartbeat driver starting"
        );

        let mut ticker = time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let BeatOutcome::Saved { sweep: Some(_) } = self.heart.beat().await {
                        tracing::debug!("Metrics sweep started");
                    }
                }
                update = next_update(&mut updates) => {
                    match update {
                        Some(connection) => self.apply(&connection),
                        None => {
                            tracing::debug!("Connection update channel closed");
                            updates = None;
                        }
                    }
                }
                _ = &mut stop => {
                    tracing::info!("Heartbeat driver stopping");
                    break;
                }
            }
        }

        self.heart.close();
    }

    fn apply(&self, connection: &ConnectionConfig) {
        self.factory
            .apply_settings(ConnectionSettings::from_config(connection));
        tracing::info!(
            local_mode = connection.local_mode,
            ports = connection.ports.len(),
            "Applied reloaded connection settings"
        );
    }
}

async fn next_update(
    rx: &mut Option<mpsc::UnboundedReceiver<ConnectionConfig>>,
) -> Option<ConnectionConfig> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
