use super::rdata::{MxData, RecordData, SoaData};
use super::wire::{WireReader, WireWriter};
use crate::dns_record::{RecordClass, RecordType};
use crate::DomainError;
use std::net::IpAddr;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct DnsResourceRecord {
    pub name: String,
    pub rtype: RecordType,
    pub class: RecordClass,
    ttl: u32,
    expires_at: Option<Instant>,
    pub rdata: RecordData,
}

impl DnsResourceRecord {
    /// `rtype` only matters for [`RecordData::Unknown`]; every other payload
    /// carries its own type.
    pub fn new(
        name: impl Into<String>,
        rtype: RecordType,
        class: RecordClass,
        ttl: u32,
        rdata: RecordData,
    ) -> Self {
        let mut name = name.into();
        if name.ends_with('.') {
            name.pop();
        }
        Self {
            name,
            rtype: rdata.record_type().unwrap_or(rtype),
            class,
            ttl,
            expires_at: None,
            rdata,
        }
    }

    /// A or AAAA record, depending on the address family.
    pub fn address(name: impl Into<String>, ttl: u32, ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Self::new(name, RecordType::A, RecordClass::IN, ttl, RecordData::A(v4)),
            IpAddr::V6(v6) => Self::new(
                name,
                RecordType::AAAA,
                RecordClass::IN,
                ttl,
                RecordData::Aaaa(v6),
            ),
        }
    }

    pub fn ns(name: impl Into<String>, ttl: u32, host: impl Into<String>) -> Self {
        Self::new(name, RecordType::NS, RecordClass::IN, ttl, RecordData::Ns(host.into()))
    }

    pub fn cname(name: impl Into<String>, ttl: u32, target: impl Into<String>) -> Self {
        Self::new(
            name,
            RecordType::CNAME,
            RecordClass::IN,
            ttl,
            RecordData::Cname(target.into()),
        )
    }

    pub fn ptr(name: impl Into<String>, ttl: u32, target: impl Into<String>) -> Self {
        Self::new(name, RecordType::PTR, RecordClass::IN, ttl, RecordData::Ptr(target.into()))
    }

    pub fn mx(name: impl Into<String>, ttl: u32, preference: u16, exchange: impl Into<String>) -> Self {
        Self::new(
            name,
            RecordType::MX,
            RecordClass::IN,
            ttl,
            RecordData::Mx(MxData {
                preference,
                exchange: exchange.into(),
            }),
        )
    }

    pub fn soa(name: impl Into<String>, ttl: u32, soa: SoaData) -> Self {
        Self::new(name, RecordType::SOA, RecordClass::IN, ttl, RecordData::Soa(soa))
    }

    pub fn txt(name: impl Into<String>, ttl: u32, text: impl Into<String>) -> Self {
        Self::new(name, RecordType::TXT, RecordClass::IN, ttl, RecordData::Txt(text.into()))
    }

    /// The TTL as stored, ignoring any expiry.
    pub fn original_ttl(&self) -> u32 {
        self.ttl
    }

    /// Remaining lifetime once [`Self::set_expiry`] was called, otherwise the
    /// stored TTL. Never negative.
    pub fn ttl_value(&self) -> u32 {
        self.ttl_value_at(Instant::now())
    }

    pub fn ttl_value_at(&self, now: Instant) -> u32 {
        match self.expires_at {
            Some(expires_at) => {
                let remaining = expires_at.saturating_duration_since(now).as_secs();
                u32::try_from(remaining).unwrap_or(u32::MAX)
            }
            None => self.ttl,
        }
    }

    /// Pins the record's expiry at `now + ttl`.
    pub fn set_expiry(&mut self) {
        self.set_expiry_from(Instant::now());
    }

    pub fn set_expiry_from(&mut self, now: Instant) {
        self.expires_at = Some(now + Duration::from_secs(u64::from(self.ttl)));
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Replaces the static TTL, dropping any expiry.
    pub fn set_ttl(&mut self, ttl: u32) {
        self.ttl = ttl;
        self.expires_at = None;
    }

    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, DomainError> {
        let name = reader.read_domain()?;
        let rtype = RecordType::from_u16(reader.read_u16()?);
        let class = RecordClass::from_u16(reader.read_u16()?);
        let ttl = reader.read_u32()?;
        let rdlength = usize::from(reader.read_u16()?);
        let rdata = RecordData::read(reader, rtype, rdlength)?;

        Ok(Self {
            name,
            rtype,
            class,
            ttl,
            expires_at: None,
            rdata,
        })
    }

    /// Writes the record; RDLENGTH is backfilled from what the payload wrote.
    pub fn write(&self, writer: &mut WireWriter) -> Result<(), DomainError> {
        writer.write_domain(&self.name)?;
        writer.write_u16(self.rtype.to_u16());
        writer.write_u16(self.class.to_u16());
        writer.write_u32(self.ttl_value());

        let rdlength_pos = writer.placeholder_u16();
        self.rdata.write(writer)?;
        let rdlength = writer.len() - rdlength_pos - 2;
        let rdlength = u16::try_from(rdlength).map_err(|_| DomainError::MessageTooLarge {
            size: rdlength,
            max: usize::from(u16::MAX),
        })?;
        writer.patch_u16(rdlength_pos, rdlength);
        Ok(())
    }
}

impl PartialEq for DnsResourceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.rtype == other.rtype
            && self.class == other.class
            && self.ttl == other.ttl
            && self.rdata == other.rdata
    }
}
