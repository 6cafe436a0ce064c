//! Connection factory with health-scored failover.
//!
//! # Responsibilities
//! - Resolve host identifiers and dial them with the configured credentials
//! - Enforce the per-connection timeout around the client's dial
//! - Fail over across candidate hosts, preferring hosts with a clean history
//! - Feed every dial outcome into the shared [`HostHealthTracker`]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use rand::seq::SliceRandom;
use tokio::time;

use crate::config::ConnectionConfig;
use crate::connection::client::{Connection, ManagementClient, ProgressHandler};
use crate::connection::resolver::resolve_address;
use crate::connection::target::{AddressTranslator, ConnectionTarget, Credentials, MappedAddressTranslator};
use crate::error::{ConfigurationError, ConnectionError, ConnectionResult};
use crate::health::HostHealthTracker;
use crate::storage::Cluster;

/// Factory-wide dial settings, replaced as a whole on every change.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    pub local_mode: bool,
    pub ports: HashMap<String, u16>,
    pub credentials: Option<Credentials>,
    pub translator: Option<Arc<dyn AddressTranslator>>,
}

impl ConnectionSettings {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            local_mode: config.local_mode,
            ports: config.ports.clone(),
            credentials: config.credentials.as_ref().map(Credentials::from),
            translator: MappedAddressTranslator::from_config(&config.address_translation),
        }
    }
}

/// Opens management connections to single hosts or to any of a set of hosts.
pub struct ConnectionFactory {
    client: Arc<dyn ManagementClient>,
    settings: ArcSwap<ConnectionSettings>,
    health: Arc<HostHealthTracker>,
}

impl ConnectionFactory {
    pub fn new(client: Arc<dyn ManagementClient>) -> Self {
        Self::with_tracker(client, Arc::new(HostHealthTracker::new()))
    }

    /// Create a factory sharing an existing health tracker.
    pub fn with_tracker(client: Arc<dyn ManagementClient>, health: Arc<HostHealthTracker>) -> Self {
        Self {
            client,
            settings: ArcSwap::from_pointee(ConnectionSettings::default()),
            health,
        }
    }

    pub fn health(&self) -> &Arc<HostHealthTracker> {
        &self.health
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<ConnectionSettings> {
        self.settings.load_full()
    }

    pub fn apply_settings(&self, settings: ConnectionSettings) {
        self.settings.store(Arc::new(settings));
    }

    pub fn set_ports(&self, ports: HashMap<String, u16>) {
        self.update(|s| s.ports = ports.clone());
    }

    pub fn set_credentials(&self, credentials: Option<Credentials>) {
        self.update(|s| s.credentials = credentials.clone());
    }

    pub fn set_address_translator(&self, translator: Option<Arc<dyn AddressTranslator>>) {
        self.update(|s| s.translator = translator.clone());
    }

    pub fn set_local_mode(&self, local_mode: bool) {
        self.update(|s| s.local_mode = local_mode);
    }

    /// The target `host` would be dialed with under the current settings.
    pub fn target_for(&self, host: &str) -> ConnectionTarget {
        let settings = self.settings.load();
        ConnectionTarget {
            host: host.to_string(),
            address: resolve_address(host, settings.local_mode, &settings.ports),
            translator: settings.translator.clone(),
        }
    }

    /// Open a connection to `host`, recording the outcome in the health tracker.
    pub async fn connect(
        &self,
        host: &str,
        timeout: Duration,
        handler: Option<Arc<dyn ProgressHandler>>,
    ) -> ConnectionResult<Connection> {
        let result = self.dial(host, timeout, handler).await;
        match &result {
            Ok(_) => self.health.record_success(host),
            Err(_) => self.health.record_failure(host),
        };
        result
    }

    /// Connect to any one of `candidates`.
    ///
    /// Candidates are shuffled, then tried in two passes: the first only
    /// visits hosts whose score is nonnegative, the second visits the hosts
    /// the first skipped. The first successful dial is returned.
    pub async fn connect_any<I>(
        &self,
        candidates: I,
        timeout: Duration,
        handler: Option<Arc<dyn ProgressHandler>>,
    ) -> ConnectionResult<Connection>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut hosts: Vec<String> = candidates
            .into_iter()
            .map(|h| h.as_ref().to_string())
            .collect();
        if hosts.is_empty() {
            return Err(ConfigurationError::NoCandidates.into());
        }
        hosts.shuffle(&mut rand::thread_rng());

        let mut attempted = 0;
        let mut deferred = Vec::new();

        for host in hosts {
            if !self.health.is_preferred(&host) {
                deferred.push(host);
                continue;
            }
            attempted += 1;
            if let Some(conn) = self.attempt(&host, timeout, handler.clone()).await {
                return Ok(conn);
            }
        }

        for host in deferred {
            attempted += 1;
            if let Some(conn) = self.attempt(&host, timeout, handler.clone()).await {
                return Ok(conn);
            }
        }

        Err(ConnectionError::Exhausted { attempted })
    }

    /// Connect to any seed host of `cluster`.
    pub async fn connect_cluster(&self, cluster: &Cluster, timeout: Duration) -> ConnectionResult<Connection> {
        if cluster.seed_hosts.is_empty() {
            return Err(ConfigurationError::NoSeeds {
                cluster: cluster.name.clone(),
            }
            .into());
        }
        self.connect_any(&cluster.seed_hosts, timeout, None).await
    }

    async fn attempt(
        &self,
        host: &str,
        timeout: Duration,
        handler: Option<Arc<dyn ProgressHandler>>,
    ) -> Option<Connection> {
        match self.connect(host, timeout, handler).await {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::info!(host = %host, score = self.health.score(host), error = %e, "Unreachable host");
                None
            }
        }
    }

    async fn dial(
        &self,
        host: &str,
        timeout: Duration,
        handler: Option<Arc<dyn ProgressHandler>>,
    ) -> ConnectionResult<Connection> {
        let settings = self.settings.load_full();
        let target = ConnectionTarget {
            host: host.to_string(),
            address: resolve_address(host, settings.local_mode, &settings.ports),
            translator: settings.translator.clone(),
        };

        let fut = self
            .client
            .dial(&target, settings.credentials.as_ref(), timeout, handler);
        match time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout {
                host: host.to_string(),
                timeout,
            }),
        }
    }

    fn update(&self, mut apply: impl FnMut(&mut ConnectionSettings)) {
        self.settings.rcu(|current| {
            let mut next = ConnectionSettings::clone(current);
            apply(&mut next);
            next
        });
    }
}

impl std::fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("settings", &self.settings.load_full())
            .field("known_hosts", &self.health.snapshot().len())
            .finish()
    }
}
