//! Host identifier → dial address.
//!
//! Pure and infallible: when no rule applies the identifier is returned as is.

use std::collections::HashMap;

/// Address every host resolves to in local mode.
pub const LOOPBACK: &str = "127.0.0.1";

/// Resolve the address to dial for `host`.
///
/// Local mode wins over everything, including a port mapping for `host`.
/// Otherwise a mapped port is appended unless the identifier already has one.
pub fn resolve_address(host: &str, local_mode: bool, ports: &HashMap<String, u16>) -> String {
    if local_mode {
        return LOOPBACK.to_string();
    }
    if host.contains(':') {
        return host.to_string();
    }
    match ports.get(host) {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
