//! Type-specific RDATA payloads.

use super::wire::{WireReader, WireWriter};
use crate::dns_record::RecordType;
use crate::DomainError;
use bytes::Bytes;
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoaData {
    pub primary_name_server: String,
    pub responsible_person: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxData {
    pub preference: u16,
    pub exchange: String,
}

/// Sorts by preference ascending, keeping input order among equal preferences.
pub fn sort_by_preference(records: &mut [MxData]) {
    records.sort_by_key(|mx| mx.preference);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(String),
    Cname(String),
    Ptr(String),
    Soa(SoaData),
    Mx(MxData),
    Txt(String),
    /// Raw RDATA of a type this codec does not interpret.
    Unknown(Bytes),
}

impl RecordData {
    /// Parses `rdlength` bytes of RDATA at the reader's position.
    ///
    /// The reader always ends up right after the RDATA, whatever the payload
    /// consumed, so names compressed into earlier parts of the message still
    /// resolve.
    pub fn read(
        reader: &mut WireReader<'_>,
        rtype: RecordType,
        rdlength: usize,
    ) -> Result<Self, DomainError> {
        let start = reader.position();
        let end = start + rdlength;
        if rdlength > reader.remaining() {
            return Err(DomainError::EndOfStream { offset: end });
        }

        let data = match rtype {
            RecordType::A => {
                let octets: [u8; 4] = reader
                    .read_bytes(rdlength)?
                    .try_into()
                    .map_err(|_| unsupported_length(rtype, rdlength))?;
                RecordData::A(Ipv4Addr::from(octets))
            }
            RecordType::AAAA => {
                let octets: [u8; 16] = reader
                    .read_bytes(rdlength)?
                    .try_into()
                    .map_err(|_| unsupported_length(rtype, rdlength))?;
                RecordData::Aaaa(Ipv6Addr::from(octets))
            }
            RecordType::NS => RecordData::Ns(reader.read_domain()?),
            RecordType::CNAME => RecordData::Cname(reader.read_domain()?),
            RecordType::PTR => RecordData::Ptr(reader.read_domain()?),
            RecordType::SOA => RecordData::Soa(SoaData {
                primary_name_server: reader.read_domain()?,
                responsible_person: reader.read_domain()?,
                serial: reader.read_u32()?,
                refresh: reader.read_u32()?,
                retry: reader.read_u32()?,
                expire: reader.read_u32()?,
                minimum: reader.read_u32()?,
            }),
            RecordType::MX => RecordData::Mx(MxData {
                preference: reader.read_u16()?,
                exchange: reader.read_domain()?,
            }),
            RecordType::TXT => RecordData::Txt(read_text(reader, end)?),
            RecordType::ANY | RecordType::Unknown(_) => {
                RecordData::Unknown(Bytes::copy_from_slice(reader.read_bytes(rdlength)?))
            }
        };

        if reader.position() > end {
            return Err(DomainError::EndOfStream {
                offset: reader.position(),
            });
        }
        reader.set_position(end);
        Ok(data)
    }

    pub fn write(&self, writer: &mut WireWriter) -> Result<(), DomainError> {
        match self {
            RecordData::A(ip) => writer.write_bytes(&ip.octets()),
            RecordData::Aaaa(ip) => writer.write_bytes(&ip.octets()),
            RecordData::Ns(name) | RecordData::Cname(name) | RecordData::Ptr(name) => {
                writer.write_domain(name)?
            }
            RecordData::Soa(soa) => {
                writer.write_domain(&soa.primary_name_server)?;
                writer.write_domain(&soa.responsible_person)?;
                writer.write_u32(soa.serial);
                writer.write_u32(soa.refresh);
                writer.write_u32(soa.retry);
                writer.write_u32(soa.expire);
                writer.write_u32(soa.minimum);
            }
            RecordData::Mx(mx) => {
                writer.write_u16(mx.preference);
                writer.write_domain(&mx.exchange)?;
            }
            RecordData::Txt(text) => {
                // read back byte per char, so anything past ASCII would not survive
                if !text.is_ascii() {
                    return Err(DomainError::InvalidLabel(format!(
                        "TXT string contains non-ASCII characters: {}",
                        text
                    )));
                }
                let len = u8::try_from(text.len()).map_err(|_| {
                    DomainError::InvalidLabel(format!(
                        "TXT string of {} bytes exceeds 255",
                        text.len()
                    ))
                })?;
                writer.write_u8(len);
                writer.write_bytes(text.as_bytes());
            }
            RecordData::Unknown(raw) => writer.write_bytes(raw),
        }
        Ok(())
    }

    /// Record type this payload belongs to, when it is fixed by the variant.
    pub fn record_type(&self) -> Option<RecordType> {
        match self {
            RecordData::A(_) => Some(RecordType::A),
            RecordData::Aaaa(_) => Some(RecordType::AAAA),
            RecordData::Ns(_) => Some(RecordType::NS),
            RecordData::Cname(_) => Some(RecordType::CNAME),
            RecordData::Ptr(_) => Some(RecordType::PTR),
            RecordData::Soa(_) => Some(RecordType::SOA),
            RecordData::Mx(_) => Some(RecordType::MX),
            RecordData::Txt(_) => Some(RecordType::TXT),
            RecordData::Unknown(_) => None,
        }
    }
}

fn unsupported_length(rtype: RecordType, rdlength: usize) -> DomainError {
    DomainError::UnsupportedAddressFamily(format!(
        "{} record with {} bytes of address data",
        rtype, rdlength
    ))
}

// Character-strings are concatenated when a server sends more than one.
fn read_text(reader: &mut WireReader<'_>, end: usize) -> Result<String, DomainError> {
    let mut text = String::new();
    while reader.position() < end {
        let len = usize::from(reader.read_u8()?);
        let chunk = reader.read_bytes(len)?;
        text.extend(chunk.iter().map(|&b| char::from(b)));
    }
    Ok(text)
}
