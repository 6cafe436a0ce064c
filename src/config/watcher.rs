//! Connection-settings hot reload.
//!
//! Only the `[connection]` section is applied at runtime. Each reload is
//! compared against the last section forwarded, and nothing is sent when it
//! is unchanged, so edits to heartbeat or logging settings never rebuild the
//! factory's dial settings.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ConnectionConfig;

/// What a single reload did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The connection section changed and was forwarded.
    Forwarded,
    /// The file is valid but its connection section is unchanged.
    Unchanged,
    /// The file failed to load or validate; the previous settings stay.
    Rejected,
}

/// Follows the config file and forwards changed connection sections.
pub struct ConnectionWatcher {
    path: PathBuf,
    current: Mutex<ConnectionConfig>,
    update_tx: mpsc::UnboundedSender<ConnectionConfig>,
}

impl ConnectionWatcher {
    /// `initial` is the connection section already in effect.
    pub fn new(
        path: &Path,
        initial: ConnectionConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ConnectionConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current: Mutex::new(initial),
            update_tx,
        };
        (Arc::new(watcher), update_rx)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and forward the connection section if it changed.
    pub fn reload(&self) -> ReloadOutcome {
        let config = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Failed to reload config, keeping current connection settings");
                return ReloadOutcome::Rejected;
            }
        };

        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        if *current == config.connection {
            tracing::debug!(path = ?self.path, "Config reloaded, connection settings unchanged");
            return ReloadOutcome::Unchanged;
        }
        *current = config.connection.clone();
        drop(current);

        if self.update_tx.send(config.connection).is_err() {
            tracing::debug!("No receiver for connection settings");
        }
        tracing::info!(path = ?self.path, "Connection settings changed");
        ReloadOutcome::Forwarded
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn watch(self: Arc<Self>) -> Result<RecommendedWatcher, notify::Error> {
        let reloader = self.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    reloader.reload();
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
