mod helpers;

use ferrous_netkit_application::ports::DnsTransport;
use ferrous_netkit_domain::{
    DnsDatagram, DnsQuestionRecord, DnsTransportProtocol, DomainError, NameServerAddress,
    RecordClass, RecordData, RecordType,
};
use ferrous_netkit_infrastructure::NetworkTransport;
use helpers::{a_record, answer, encode, MockDnsServer};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

fn query(id: u16) -> DnsDatagram {
    DnsDatagram::query(
        id,
        DnsQuestionRecord::new("example.com", RecordType::A, RecordClass::IN),
        true,
    )
}

fn server(addr: std::net::SocketAddr, protocol: DnsTransportProtocol) -> NameServerAddress {
    NameServerAddress::new(addr, protocol)
}

#[tokio::test]
async fn test_udp_exchange_returns_reply() {
    let mock = MockDnsServer::udp(|q| encode(&answer(q, vec![a_record("example.com", "192.0.2.10")]))).await;
    let message = query(0x1234).to_bytes().unwrap();

    let raw = NetworkTransport::new()
        .send(
            &server(mock.addr(), DnsTransportProtocol::Udp),
            &message,
            Duration::from_secs(2),
        )
        .await
        .unwrap();

    let response = DnsDatagram::from_bytes(&raw).unwrap();
    assert_eq!(response.id(), 0x1234);
    assert_eq!(
        response.answer[0].rdata,
        RecordData::A("192.0.2.10".parse().unwrap())
    );
    assert_eq!(mock.udp_queries(), 1);
}

#[tokio::test]
async fn test_udp_drops_reply_with_wrong_id() {
    let mock = MockDnsServer::udp(|q| {
        let mut spoofed = answer(q, vec![a_record("example.com", "203.0.113.66")]);
        spoofed.header.id = q.id().wrapping_add(1);
        let genuine = answer(q, vec![a_record("example.com", "192.0.2.10")]);
        vec![
            spoofed.to_bytes().unwrap().to_vec(),
            genuine.to_bytes().unwrap().to_vec(),
        ]
    })
    .await;
    let message = query(0x0BAD).to_bytes().unwrap();

    let raw = NetworkTransport::new()
        .send(
            &server(mock.addr(), DnsTransportProtocol::Udp),
            &message,
            Duration::from_secs(2),
        )
        .await
        .unwrap();

    let response = DnsDatagram::from_bytes(&raw).unwrap();
    assert_eq!(response.id(), 0x0BAD);
    assert_eq!(
        response.answer[0].rdata,
        RecordData::A("192.0.2.10".parse().unwrap())
    );
}

#[tokio::test]
async fn test_udp_silent_server_times_out() {
    let mock = MockDnsServer::udp(|_| Vec::new()).await;
    let message = query(7).to_bytes().unwrap();
    let started = Instant::now();

    let err = NetworkTransport::new()
        .send(
            &server(mock.addr(), DnsTransportProtocol::Udp),
            &message,
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::TransportTimeout { .. }));
    assert!(err.is_transport_error());
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_tcp_exchange_returns_reply() {
    let mock = MockDnsServer::tcp(|q| encode(&answer(q, vec![a_record("example.com", "192.0.2.20")]))).await;
    let message = query(0x4242).to_bytes().unwrap();

    let raw = NetworkTransport::new()
        .send(
            &server(mock.addr(), DnsTransportProtocol::Tcp),
            &message,
            Duration::from_secs(2),
        )
        .await
        .unwrap();

    let response = DnsDatagram::from_bytes(&raw).unwrap();
    assert_eq!(response.id(), 0x4242);
    assert_eq!(mock.tcp_queries(), 1);
}

#[tokio::test]
async fn test_tcp_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = NetworkTransport::new()
        .send(
            &server(addr, DnsTransportProtocol::Tcp),
            &query(1).to_bytes().unwrap(),
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::TransportConnectionRefused { .. }));
}

#[tokio::test]
async fn test_tcp_server_closing_early_is_a_reset() {
    let mock = MockDnsServer::tcp(|_| Vec::new()).await;

    let err = NetworkTransport::new()
        .send(
            &server(mock.addr(), DnsTransportProtocol::Tcp),
            &query(1).to_bytes().unwrap(),
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::TransportConnectionReset { .. }));
}
