//! Ferrous Netkit infrastructure: the concurrent `ByteTree`, network
//! transports, the response cache, name-server discovery and the wiring that
//! turns configuration into a ready `DnsClient`.
pub mod collections;
pub mod dns;
pub mod logging;

pub use collections::ByteTree;
pub use dns::{
    ByteTreeResponseCache, DnsClientBuilder, FastRandom, NetworkTransport, SystemNameServers,
};
pub use logging::init_logging;
