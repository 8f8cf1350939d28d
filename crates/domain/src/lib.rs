//! Ferrous Netkit domain layer: the DNS message model and its wire codec,
//! name-server addressing, root hints, errors and configuration.
pub mod config;
pub mod dns_message;
pub mod dns_protocol;
pub mod dns_record;
pub mod errors;
pub mod root_hints;

pub use config::{CacheConfig, Config, ConfigError, LogFormat, LoggingConfig, ResolverConfig};
pub use dns_message::{
    DnsDatagram, DnsDatagramMetadata, DnsHeader, DnsQuestionRecord, DnsResourceRecord, MxData,
    RecordData, SoaData,
};
pub use dns_protocol::{DnsTransportProtocol, NameServerAddress, DEFAULT_DNS_PORT};
pub use dns_record::{OpCode, RecordClass, RecordType, ResponseCode};
pub use errors::DomainError;
pub use root_hints::{root_name_servers, RootServer, ROOT_SERVERS};
