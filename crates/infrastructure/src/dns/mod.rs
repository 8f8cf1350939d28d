pub mod builder;
pub mod random;
pub mod response_cache;
pub mod system_servers;
pub mod transport;

pub use builder::DnsClientBuilder;
pub use random::FastRandom;
pub use response_cache::ByteTreeResponseCache;
pub use system_servers::{
    parse_resolv_conf, SystemNameServers, DEFAULT_RESOLV_CONF, FALLBACK_NAME_SERVERS,
};
pub use transport::NetworkTransport;
