//! DNS over UDP (RFC 1035 §4.2.1).
//!
//! The message goes out as a single datagram with no framing. Replies are
//! read until one arrives from the queried server carrying the query's ID.
//! Anything else is dropped and the wait continues until the deadline.

use super::map_io_error;
use bytes::Bytes;
use ferrous_netkit_domain::DomainError;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// Large enough for an EDNS(0)-sized reply; plain DNS stops at 512.
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

pub async fn exchange(
    server: SocketAddr,
    message: &[u8],
    timeout: Duration,
) -> Result<Bytes, DomainError> {
    let deadline = Instant::now() + timeout;
    let expected_id = message_id(message);

    // ephemeral port, fresh per attempt
    let bind_addr = if server.is_ipv4() {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    };
    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| map_io_error(e, server))?;

    let bytes_sent = timeout_at(deadline, socket.send_to(message, server))
        .await
        .map_err(|_| timed_out(server))?
        .map_err(|e| map_io_error(e, server))?;

    debug!(server = %server, bytes_sent, "UDP query sent");

    let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
    loop {
        let (bytes_received, from_addr) = timeout_at(deadline, socket.recv_from(&mut recv_buf))
            .await
            .map_err(|_| timed_out(server))?
            .map_err(|e| map_io_error(e, server))?;

        if from_addr != server {
            warn!(
                expected = %server,
                received_from = %from_addr,
                "Dropping UDP response from unexpected source"
            );
            continue;
        }

        let received_id = message_id(&recv_buf[..bytes_received]);
        if received_id != expected_id {
            warn!(
                server = %server,
                expected_id = ?expected_id,
                received_id = ?received_id,
                "Dropping UDP response with mismatched ID"
            );
            continue;
        }

        debug!(server = %server, bytes_received, "UDP response received");
        recv_buf.truncate(bytes_received);
        return Ok(Bytes::from(recv_buf));
    }
}

fn message_id(message: &[u8]) -> Option<u16> {
    match message {
        [high, low, ..] => Some(u16::from_be_bytes([*high, *low])),
        _ => None,
    }
}

fn timed_out(server: SocketAddr) -> DomainError {
    DomainError::TransportTimeout {
        server: server.to_string(),
    }
}
