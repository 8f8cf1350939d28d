pub mod tcp;
pub mod udp;

use async_trait::async_trait;
use bytes::Bytes;
use ferrous_netkit_application::ports::DnsTransport;
use ferrous_netkit_domain::{DnsTransportProtocol, DomainError, NameServerAddress};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// Sends queries over real sockets, picking UDP or TCP from the server
/// address. Every call opens its own socket, so one instance can be shared by
/// any number of concurrent lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkTransport;

impl NetworkTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DnsTransport for NetworkTransport {
    async fn send(
        &self,
        server: &NameServerAddress,
        message: &[u8],
        timeout: Duration,
    ) -> Result<Bytes, DomainError> {
        match server.protocol {
            DnsTransportProtocol::Udp => udp::exchange(server.addr, message, timeout).await,
            DnsTransportProtocol::Tcp => tcp::exchange(server.addr, message, timeout).await,
        }
    }
}

pub(crate) fn map_io_error(error: io::Error, server: SocketAddr) -> DomainError {
    let server_name = server.to_string();
    match error.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => DomainError::TransportTimeout {
            server: server_name,
        },
        io::ErrorKind::ConnectionRefused => DomainError::TransportConnectionRefused {
            server: server_name,
        },
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => DomainError::TransportConnectionReset {
            server: server_name,
        },
        _ => DomainError::IoError(format!("{}: {}", server_name, error)),
    }
}
