//! Dial targets, credentials and address translation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AddressTranslationConfig, CredentialsConfig};

/// Username/password pair presented to the management endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl From<&CredentialsConfig> for Credentials {
    fn from(config: &CredentialsConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Rewrites an address advertised by the cluster into one this process can reach.
pub trait AddressTranslator: Send + Sync + std::fmt::Debug {
    fn translate(&self, address: &str) -> String;
}

/// Translator backed by a static lookup table; unknown addresses pass through.
#[derive(Debug, Clone, Default)]
pub struct MappedAddressTranslator {
    mappings: HashMap<String, String>,
}

impl MappedAddressTranslator {
    pub fn new(mappings: HashMap<String, String>) -> Self {
        Self { mappings }
    }

    /// Build from config, or `None` when translation is disabled.
    pub fn from_config(config: &AddressTranslationConfig) -> Option<Arc<dyn AddressTranslator>> {
        if !config.enabled {
            return None;
        }
        Some(Arc::new(Self::new(config.mappings.clone())))
    }
}

impl AddressTranslator for MappedAddressTranslator {
    fn translate(&self, address: &str) -> String {
        // Translate the host part only, keeping any explicit port.
        if let Some(mapped) = self.mappings.get(address) {
            return mapped.clone();
        }
        match address.rsplit_once(':') {
            Some((host, port)) => match self.mappings.get(host) {
                Some(mapped) => format!("{}:{}", mapped, port),
                None => address.to_string(),
            },
            None => address.to_string(),
        }
    }
}

/// Everything the client needs to open one connection.
#[derive(Debug, Clone)]
pub struct ConnectionTarget {
    /// Logical host identifier as requested by the caller.
    pub host: String,
    /// Address to dial after local-mode and port rewriting.
    pub address: String,
    /// Translator the client applies to advertised addresses.
    pub translator: Option<Arc<dyn AddressTranslator>>,
}
