//! DNS message model and its RFC 1035 wire codec.
pub mod datagram;
pub mod header;
pub mod name;
pub mod question;
pub mod rdata;
pub mod record;
pub mod wire;

pub use datagram::{DnsDatagram, DnsDatagramMetadata};
pub use header::{DnsHeader, HEADER_LENGTH};
pub use name::{parse_reverse_domain, reverse_domain, MAX_LABEL_LENGTH};
pub use question::DnsQuestionRecord;
pub use rdata::{sort_by_preference, MxData, RecordData, SoaData};
pub use record::DnsResourceRecord;
pub use wire::{WireReader, WireWriter};
