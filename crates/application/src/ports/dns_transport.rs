use async_trait::async_trait;
use bytes::Bytes;
use ferrous_netkit_domain::{DomainError, NameServerAddress};
use std::time::Duration;

/// Moves one encoded DNS message to a name server and returns the raw reply.
///
/// The transport is picked from `server.protocol`. A UDP implementation
/// drops datagrams whose ID differs from the query's and keeps waiting until
/// `timeout`. Failures to reach the server are reported with the
/// `Transport*`/`IoError` variants so the client can move on to the next one.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(
        &self,
        server: &NameServerAddress,
        message: &[u8],
        timeout: Duration,
    ) -> Result<Bytes, DomainError>;
}
