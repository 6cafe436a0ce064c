//! Management client capability.
//!
//! The wire-level client lives outside this crate. Implementations dial a
//! [`ConnectionTarget`] and hand back a [`ManagementConnection`] exposing the
//! handful of RPCs the heartbeat needs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::connection::target::{ConnectionTarget, Credentials};
use crate::error::{ConnectionResult, FetchResult};

/// Asynchronous notification pushed by the remote side of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Host that emitted the notification.
    pub host: String,
    /// Remote command the notification belongs to.
    pub command: u32,
    pub message: String,
}

/// Receives progress callbacks for long-running remote operations.
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

/// An open management session with one node.
#[async_trait]
pub trait ManagementConnection: Send + Sync {
    /// Host identifier this connection was opened for.
    fn host(&self) -> &str;

    /// Addresses of the nodes the remote currently sees as live.
    async fn list_live_nodes(&self) -> FetchResult<Vec<String>>;

    async fn datacenter(&self) -> FetchResult<String>;

    async fn pending_compactions(&self) -> FetchResult<u64>;

    async fn is_repair_running(&self) -> FetchResult<bool>;

    /// Release the session. Must be safe to call after a failed RPC.
    async fn close(&self);
}

pub type Connection = Box<dyn ManagementConnection>;

/// Opens management sessions.
#[async_trait]
pub trait ManagementClient: Send + Sync {
    async fn dial(
        &self,
        target: &ConnectionTarget,
        credentials: Option<&Credentials>,
        timeout: Duration,
        handler: Option<Arc<dyn ProgressHandler>>,
    ) -> ConnectionResult<Connection>;
}
