//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use repair_liveness::connection::{
    Connection, ConnectionTarget, Credentials, ManagementClient, ManagementConnection, ProgressHandler,
};
use repair_liveness::error::{ConnectionError, ConnectionResult, FetchResult, MetricFetchError};

/// How a scripted host behaves when dialed.
#[derive(Debug, Clone)]
pub struct HostScript {
    pub reachable: bool,
    /// Delay before the dial resolves.
    pub dial_delay: Option<Duration>,
    /// Delay before every RPC resolves.
    pub rpc_delay: Option<Duration>,
    pub live_nodes: Vec<String>,
    pub datacenter: String,
    pub pending_compactions: u64,
    pub repair_running: bool,
    /// Every RPC fails once the connection is open.
    pub broken_rpcs: bool,
}

impl HostScript {
    pub fn up() -> Self {
        Self {
            reachable: true,
            dial_delay: None,
            rpc_delay: None,
            live_nodes: Vec::new(),
            datacenter: "dc1".into(),
            pending_compactions: 0,
            repair_running: false,
            broken_rpcs: false,
        }
    }

    pub fn down() -> Self {
        Self {
            reachable: false,
            ..Self::up()
        }
    }

    pub fn seeing(mut self, nodes: &[&str]) -> Self {
        self.live_nodes = nodes.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_pending(mut self, pending: u64) -> Self {
        self.pending_compactions = pending;
        self
    }

    pub fn hanging_dial(mut self, delay: Duration) -> Self {
        self.dial_delay = Some(delay);
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken_rpcs = true;
        self
    }

    pub fn slow_rpcs(mut self, delay: Duration) -> Self {
        self.rpc_delay = Some(delay);
        self
    }
}

/// A management client whose hosts follow per-host scripts.
///
/// Unknown hosts are unreachable. Every dial is recorded with the address it
/// was resolved to.
#[derive(Default)]
pub struct ScriptedClient {
    hosts: Mutex<HashMap<String, HostScript>>,
    dials: Mutex<Vec<(String, String)>>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, host: &str, script: HostScript) {
        self.hosts.lock().unwrap().insert(host.to_string(), script);
    }

    pub fn with(self, host: &str, script: HostScript) -> Self {
        self.script(host, script);
        self
    }

    /// Hosts dialed so far, in order.
    pub fn dialed(&self) -> Vec<String> {
        self.dials.lock().unwrap().iter().map(|(h, _)| h.clone()).collect()
    }

    /// Resolved addresses dialed so far, in order.
    pub fn dialed_addresses(&self) -> Vec<String> {
        self.dials.lock().unwrap().iter().map(|(_, a)| a.clone()).collect()
    }

    pub fn dial_count(&self, host: &str) -> usize {
        self.dials.lock().unwrap().iter().filter(|(h, _)| h == host).count()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManagementClient for ScriptedClient {
    async fn dial(
        &self,
        target: &ConnectionTarget,
        _credentials: Option<&Credentials>,
        _timeout: Duration,
        _handler: Option<Arc<dyn ProgressHandler>>,
    ) -> ConnectionResult<Connection> {
        self.dials
            .lock()
            .unwrap()
            .push((target.host.clone(), target.address.clone()));
        let script = self.hosts.lock().unwrap().get(&target.host).cloned();

        let Some(script) = script else {
            return Err(ConnectionError::Dial {
                host: target.host.clone(),
                reason: "unknown host".into(),
            });
        };
        if let Some(delay) = script.dial_delay {
            tokio::time::sleep(delay).await;
        }
        if !script.reachable {
            return Err(ConnectionError::Dial {
                host: target.host.clone(),
                reason: "connection refused".into(),
            });
        }
        Ok(Box::new(ScriptedConnection {
            host: target.host.clone(),
            script,
            closes: self.closes.clone(),
        }))
    }
}

pub struct ScriptedConnection {
    host: String,
    script: HostScript,
    closes: Arc<AtomicUsize>,
}

impl ScriptedConnection {
    async fn delay(&self) -> FetchResult<()> {
        if let Some(delay) = self.script.rpc_delay {
            tokio::time::sleep(delay).await;
        }
        if self.script.broken_rpcs {
            return Err(MetricFetchError::Rpc {
                host: self.host.clone(),
                reason: "broken pipe".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ManagementConnection for ScriptedConnection {
    fn host(&self) -> &str {
        &self.host
    }

    async fn list_live_nodes(&self) -> FetchResult<Vec<String>> {
        self.delay().await?;
        Ok(self.script.live_nodes.clone())
    }

    async fn datacenter(&self) -> FetchResult<String> {
        self.delay().await?;
        Ok(self.script.datacenter.clone())
    }

    async fn pending_compactions(&self) -> FetchResult<u64> {
        self.delay().await?;
        Ok(self.script.pending_compactions)
    }

    async fn is_repair_running(&self) -> FetchResult<bool> {
        self.delay().await?;
        Ok(self.script.repair_running)
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
