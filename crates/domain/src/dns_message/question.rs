use super::name::reverse_domain;
use super::wire::{WireReader, WireWriter};
use crate::dns_record::{RecordClass, RecordType};
use crate::DomainError;
use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone, Eq)]
pub struct DnsQuestionRecord {
    pub name: String,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

impl DnsQuestionRecord {
    pub fn new(name: impl Into<String>, qtype: RecordType, qclass: RecordClass) -> Self {
        let mut name = name.into();
        if name.ends_with('.') {
            name.pop();
        }
        Self { name, qtype, qclass }
    }

    /// PTR question for `ip`, named under `in-addr.arpa` or `ip6.arpa`.
    pub fn ptr(ip: IpAddr) -> Self {
        Self::new(reverse_domain(ip), RecordType::PTR, RecordClass::IN)
    }

    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, DomainError> {
        let name = reader.read_domain()?;
        let qtype = RecordType::from_u16(reader.read_u16()?);
        let qclass = RecordClass::from_u16(reader.read_u16()?);
        Ok(Self { name, qtype, qclass })
    }

    pub fn write(&self, writer: &mut WireWriter) -> Result<(), DomainError> {
        writer.write_domain(&self.name)?;
        writer.write_u16(self.qtype.to_u16());
        writer.write_u16(self.qclass.to_u16());
        Ok(())
    }

    /// Uncompressed, lower-cased wire form. Equal questions produce equal keys.
    pub fn cache_key(&self) -> Result<Vec<u8>, DomainError> {
        let mut writer = WireWriter::without_compression(self.name.len() + 6);
        writer.write_domain(&self.name.to_ascii_lowercase())?;
        writer.write_u16(self.qtype.to_u16());
        writer.write_u16(self.qclass.to_u16());
        Ok(writer.freeze().to_vec())
    }
}

impl PartialEq for DnsQuestionRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.qtype == other.qtype
            && self.qclass == other.qclass
    }
}

impl fmt::Display for DnsQuestionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.qclass, self.qtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_encoding() {
        let question = DnsQuestionRecord::new("example.com", RecordType::A, RecordClass::IN);
        let mut writer = WireWriter::new(32);
        question.write(&mut writer).unwrap();
        assert_eq!(
            writer.freeze().as_ref(),
            b"\x07example\x03com\x00\x00\x01\x00\x01"
        );
    }

    #[test]
    fn test_case_insensitive_equality() {
        let a = DnsQuestionRecord::new("Example.COM.", RecordType::MX, RecordClass::IN);
        let b = DnsQuestionRecord::new("example.com", RecordType::MX, RecordClass::IN);
        assert_eq!(a, b);
        assert_eq!(a.cache_key().unwrap(), b.cache_key().unwrap());
    }

    #[test]
    fn test_ptr_question() {
        let question = DnsQuestionRecord::ptr("127.0.0.1".parse().unwrap());
        assert_eq!(question.name, "1.0.0.127.in-addr.arpa");
        assert_eq!(question.qtype, RecordType::PTR);
        assert_eq!(question.qclass, RecordClass::IN);
    }
}
