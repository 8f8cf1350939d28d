//! Name servers configured for the host, read from `resolv.conf`.

use ferrous_netkit_domain::NameServerAddress;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

/// Used when the host has no usable `nameserver` entries.
pub const FALLBACK_NAME_SERVERS: [IpAddr; 2] = [
    IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
    IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
];

#[derive(Debug, Clone)]
pub struct SystemNameServers {
    path: PathBuf,
}

impl Default for SystemNameServers {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemNameServers {
    pub fn new() -> Self {
        Self::with_path(DEFAULT_RESOLV_CONF)
    }

    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Servers from the file, or the fallback pair. Never empty.
    pub fn discover(&self) -> Vec<NameServerAddress> {
        let servers = match std::fs::read_to_string(&self.path) {
            Ok(contents) => parse_resolv_conf(&contents),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Cannot read resolver configuration");
                Vec::new()
            }
        };

        if servers.is_empty() {
            warn!(
                path = %self.path.display(),
                "No system name servers found, using fallback servers"
            );
            return FALLBACK_NAME_SERVERS
                .iter()
                .map(|ip| NameServerAddress::udp(*ip))
                .collect();
        }

        debug!(count = servers.len(), "Discovered system name servers");
        servers
    }
}

/// Collects the `nameserver` entries of a `resolv.conf` body, in order.
/// Comments, unknown options and unparsable addresses are skipped.
pub fn parse_resolv_conf(contents: &str) -> Vec<NameServerAddress> {
    contents
        .lines()
        .filter_map(|line| {
            let line = line.split(['#', ';']).next().unwrap_or_default();
            let mut fields = line.split_whitespace();
            if fields.next() != Some("nameserver") {
                return None;
            }
            // link-local v6 entries may carry a zone suffix
            let address = fields.next()?.split('%').next().unwrap_or_default();
            address.parse::<IpAddr>().ok()
        })
        .map(NameServerAddress::udp)
        .collect()
}
