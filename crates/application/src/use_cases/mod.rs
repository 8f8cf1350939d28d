pub mod dns;

pub use dns::{DnsClient, DnsClientSettings, MAX_HOPS};
