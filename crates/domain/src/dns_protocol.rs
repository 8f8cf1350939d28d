use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_DNS_PORT: u16 = 53;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsTransportProtocol {
    #[default]
    Udp,
    Tcp,
}

impl DnsTransportProtocol {
    pub fn protocol_name(&self) -> &'static str {
        match self {
            DnsTransportProtocol::Udp => "UDP",
            DnsTransportProtocol::Tcp => "TCP",
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            DnsTransportProtocol::Udp => "udp",
            DnsTransportProtocol::Tcp => "tcp",
        }
    }
}

impl fmt::Display for DnsTransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.protocol_name())
    }
}

/// A name server endpoint and the transport used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameServerAddress {
    pub addr: SocketAddr,
    pub protocol: DnsTransportProtocol,
    /// Host name of the server, when known (delegations, root hints).
    pub host: Option<Arc<str>>,
}

impl NameServerAddress {
    pub fn new(addr: SocketAddr, protocol: DnsTransportProtocol) -> Self {
        Self {
            addr,
            protocol,
            host: None,
        }
    }

    pub fn udp(ip: IpAddr) -> Self {
        Self::new(SocketAddr::new(ip, DEFAULT_DNS_PORT), DnsTransportProtocol::Udp)
    }

    pub fn with_host(mut self, host: impl Into<Arc<str>>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_protocol(&self, protocol: DnsTransportProtocol) -> Self {
        Self {
            protocol,
            ..self.clone()
        }
    }

    /// Parses `udp://ip[:port]`, `tcp://ip[:port]` or a bare `ip[:port]`,
    /// using `default_protocol` for the bare form.
    pub fn parse_with_default(
        s: &str,
        default_protocol: DnsTransportProtocol,
    ) -> Result<Self, String> {
        let s = s.trim();
        let (protocol, rest) = if let Some(rest) = s.strip_prefix("udp://") {
            (DnsTransportProtocol::Udp, rest)
        } else if let Some(rest) = s.strip_prefix("tcp://") {
            (DnsTransportProtocol::Tcp, rest)
        } else if s.contains("://") {
            return Err(format!(
                "Invalid name server '{}'. Expected udp://IP:PORT, tcp://IP:PORT or IP[:PORT]",
                s
            ));
        } else {
            (default_protocol, s)
        };

        let addr = parse_socket_addr(rest)
            .ok_or_else(|| format!("Invalid name server address '{}'", rest))?;
        Ok(Self::new(addr, protocol))
    }
}

fn parse_socket_addr(s: &str) -> Option<SocketAddr> {
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Some(addr);
    }
    let ip = s
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(s);
    ip.parse::<IpAddr>()
        .ok()
        .map(|ip| SocketAddr::new(ip, DEFAULT_DNS_PORT))
}

impl FromStr for NameServerAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_default(s, DnsTransportProtocol::Udp)
    }
}

impl fmt::Display for NameServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol.scheme(), self.addr)?;
        if let Some(host) = &self.host {
            write!(f, " ({})", host)?;
        }
        Ok(())
    }
}
