#![allow(dead_code)]
use ferrous_netkit_domain::{DnsDatagram, DnsResourceRecord};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::oneshot;

/// Produces the datagrams sent back for one query, in order. An empty list
/// means the server stays silent.
pub type Responder = dyn Fn(&DnsDatagram) -> Vec<Vec<u8>> + Send + Sync;

/// Loopback DNS server answering over UDP, TCP or both on the same port.
pub struct MockDnsServer {
    addr: SocketAddr,
    udp_queries: Arc<AtomicUsize>,
    tcp_queries: Arc<AtomicUsize>,
    shutdown_tx: Vec<oneshot::Sender<()>>,
}

impl MockDnsServer {
    pub async fn udp(
        responder: impl Fn(&DnsDatagram) -> Vec<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut server = Self::empty(socket.local_addr().unwrap());
        server.serve_udp(socket, Arc::new(responder));
        server
    }

    pub async fn tcp(
        responder: impl Fn(&DnsDatagram) -> Vec<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut server = Self::empty(listener.local_addr().unwrap());
        server.serve_tcp(listener, Arc::new(responder));
        server
    }

    /// UDP and TCP listeners sharing one port, each with its own responder.
    pub async fn dual(
        udp_responder: impl Fn(&DnsDatagram) -> Vec<Vec<u8>> + Send + Sync + 'static,
        tcp_responder: impl Fn(&DnsDatagram) -> Vec<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        for _ in 0..32 {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            let addr = socket.local_addr().unwrap();
            let Ok(listener) = TcpListener::bind(addr).await else {
                continue;
            };
            let mut server = Self::empty(addr);
            server.serve_udp(socket, Arc::new(udp_responder));
            server.serve_tcp(listener, Arc::new(tcp_responder));
            return server;
        }
        panic!("no port free for both UDP and TCP");
    }

    fn empty(addr: SocketAddr) -> Self {
        Self {
            addr,
            udp_queries: Arc::new(AtomicUsize::new(0)),
            tcp_queries: Arc::new(AtomicUsize::new(0)),
            shutdown_tx: Vec::new(),
        }
    }

    fn serve_udp(&mut self, socket: UdpSocket, responder: Arc<Responder>) {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        self.shutdown_tx.push(shutdown_tx);
        let queries = Arc::clone(&self.udp_queries);

        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = socket.recv_from(&mut buf) => {
                        let Ok((len, peer)) = result else { continue };
                        let Ok(query) = DnsDatagram::from_bytes(&buf[..len]) else { continue };
                        queries.fetch_add(1, Ordering::SeqCst);
                        for datagram in responder(&query) {
                            let _ = socket.send_to(&datagram, peer).await;
                        }
                    }
                }
            }
        });
    }

    fn serve_tcp(&mut self, listener: TcpListener, responder: Arc<Responder>) {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        self.shutdown_tx.push(shutdown_tx);
        let queries = Arc::clone(&self.tcp_queries);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = listener.accept() => {
                        let Ok((mut stream, _)) = result else { continue };
                        let responder = Arc::clone(&responder);
                        let queries = Arc::clone(&queries);
                        tokio::spawn(async move {
                            let mut len_buf = [0u8; 2];
                            if stream.read_exact(&mut len_buf).await.is_err() {
                                return;
                            }
                            let mut message = vec![0u8; usize::from(u16::from_be_bytes(len_buf))];
                            if stream.read_exact(&mut message).await.is_err() {
                                return;
                            }
                            let Ok(query) = DnsDatagram::from_bytes(&message) else { return };
                            queries.fetch_add(1, Ordering::SeqCst);
                            for reply in responder(&query) {
                                let mut frame = (reply.len() as u16).to_be_bytes().to_vec();
                                frame.extend_from_slice(&reply);
                                if stream.write_all(&frame).await.is_err() {
                                    return;
                                }
                            }
                        });
                    }
                }
            }
        });
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn udp_queries(&self) -> usize {
        self.udp_queries.load(Ordering::SeqCst)
    }

    pub fn tcp_queries(&self) -> usize {
        self.tcp_queries.load(Ordering::SeqCst)
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        for tx in self.shutdown_tx.drain(..) {
            let _ = tx.send(());
        }
    }
}

/// NOERROR reply echoing the query with the given answer records.
pub fn answer(query: &DnsDatagram, records: Vec<DnsResourceRecord>) -> DnsDatagram {
    let mut header = query.header.clone();
    header.is_response = true;
    header.recursion_available = true;
    DnsDatagram::new(header, query.question.clone(), records, Vec::new(), Vec::new())
}

pub fn encode(response: &DnsDatagram) -> Vec<Vec<u8>> {
    vec![response.to_bytes().unwrap().to_vec()]
}

pub fn a_record(name: &str, ip: &str) -> DnsResourceRecord {
    DnsResourceRecord::address(name, 300, ip.parse().unwrap())
}
