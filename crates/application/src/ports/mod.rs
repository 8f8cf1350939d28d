mod dns_response_cache;
mod dns_transport;
mod random_source;

pub use dns_response_cache::DnsResponseCache;
pub use dns_transport::DnsTransport;
pub use random_source::RandomSource;
