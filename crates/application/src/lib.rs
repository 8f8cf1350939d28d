//! Ferrous Netkit application layer: the ports the resolver depends on and
//! the `DnsClient` built on top of them.
pub mod ports;
pub mod use_cases;
