mod client;
mod iterative;

pub use client::{check_response, DnsClient, DnsClientSettings, MAX_HOPS};
