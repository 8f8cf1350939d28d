//! DNS over TCP (RFC 1035 §4.2.2): each message is prefixed with its length
//! as a big-endian u16. One connection per exchange.

use super::map_io_error;
use bytes::{BufMut, Bytes, BytesMut};
use ferrous_netkit_domain::DomainError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

pub async fn exchange(
    server: SocketAddr,
    message: &[u8],
    timeout: Duration,
) -> Result<Bytes, DomainError> {
    let deadline = Instant::now() + timeout;

    let mut stream = timeout_at(deadline, TcpStream::connect(server))
        .await
        .map_err(|_| timed_out(server))?
        .map_err(|e| map_io_error(e, server))?;
    stream
        .set_nodelay(true)
        .map_err(|e| map_io_error(e, server))?;

    timeout_at(deadline, send_with_length_prefix(&mut stream, message, server))
        .await
        .map_err(|_| timed_out(server))??;

    debug!(server = %server, message_len = message.len(), "TCP query sent");

    let response = timeout_at(deadline, read_with_length_prefix(&mut stream, server))
        .await
        .map_err(|_| timed_out(server))??;

    debug!(server = %server, response_len = response.len(), "TCP response received");
    Ok(response)
}

pub(crate) async fn send_with_length_prefix<S>(
    stream: &mut S,
    message: &[u8],
    server: SocketAddr,
) -> Result<(), DomainError>
where
    S: AsyncWriteExt + Unpin,
{
    let length = u16::try_from(message.len()).map_err(|_| DomainError::MessageTooLarge {
        size: message.len(),
        max: usize::from(u16::MAX),
    })?;

    let mut frame = BytesMut::with_capacity(message.len() + 2);
    frame.put_u16(length);
    frame.put_slice(message);

    stream
        .write_all(&frame)
        .await
        .map_err(|e| map_io_error(e, server))?;
    stream.flush().await.map_err(|e| map_io_error(e, server))
}

pub(crate) async fn read_with_length_prefix<S>(
    stream: &mut S,
    server: SocketAddr,
) -> Result<Bytes, DomainError>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| map_io_error(e, server))?;

    let mut response = vec![0u8; usize::from(u16::from_be_bytes(len_buf))];
    stream
        .read_exact(&mut response)
        .await
        .map_err(|e| map_io_error(e, server))?;

    Ok(Bytes::from(response))
}

fn timed_out(server: SocketAddr) -> DomainError {
    DomainError::TransportTimeout {
        server: server.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> SocketAddr {
        "127.0.0.1:53".parse().unwrap()
    }

    #[tokio::test]
    async fn test_length_prefix_round_trip() {
        let (mut client, mut peer) = tokio::io::duplex(64);

        send_with_length_prefix(&mut client, &[1, 2, 3], server())
            .await
            .unwrap();
        let received = read_with_length_prefix(&mut peer, server()).await.unwrap();

        assert_eq!(&received[..], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_frame_starts_with_big_endian_length() {
        let (mut client, mut peer) = tokio::io::duplex(1024);
        let message = vec![0u8; 300];

        send_with_length_prefix(&mut client, &message, server())
            .await
            .unwrap();
        let mut prefix = [0u8; 2];
        peer.read_exact(&mut prefix).await.unwrap();

        assert_eq!(prefix, [0x01, 0x2C]);
    }

    #[tokio::test]
    async fn test_short_body_is_reported_as_reset() {
        let (mut client, mut peer) = tokio::io::duplex(64);
        client.write_all(&[0x00, 0x10, 0xAA]).await.unwrap();
        drop(client);

        let err = read_with_length_prefix(&mut peer, server())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::TransportConnectionReset { .. }));
    }
}
