use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::ConfigError;
use crate::dns_protocol::{DnsTransportProtocol, NameServerAddress};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// `udp://ip:port`, `tcp://ip:port` or bare `ip[:port]`.
    /// Empty means the system resolvers are used.
    #[serde(default)]
    pub servers: Vec<String>,

    /// Transport for servers given without a scheme.
    #[serde(default)]
    pub protocol: DnsTransportProtocol,

    /// Passes over the server list before giving up.
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_true")]
    pub recursion_desired: bool,

    #[serde(default = "default_true")]
    pub tcp_fallback_on_truncation: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            protocol: DnsTransportProtocol::default(),
            retries: default_retries(),
            timeout_ms: default_timeout_ms(),
            recursion_desired: true,
            tcp_fallback_on_truncation: true,
        }
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn name_servers(&self) -> Result<Vec<NameServerAddress>, ConfigError> {
        self.servers
            .iter()
            .map(|s| {
                NameServerAddress::parse_with_default(s, self.protocol)
                    .map_err(ConfigError::Validation)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retries == 0 {
            return Err(ConfigError::Validation(
                "resolver.retries must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "resolver.timeout_ms cannot be 0".to_string(),
            ));
        }
        self.name_servers().map(|_| ())
    }
}

fn default_retries() -> u32 {
    2
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}
