use super::wire::{WireReader, WireWriter};
use crate::dns_record::{OpCode, ResponseCode};
use crate::DomainError;

pub const HEADER_LENGTH: usize = 12;

/// Fixed 12-byte message header (RFC 1035 §4.1.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16,
    pub is_response: bool,
    pub opcode: OpCode,
    pub authoritative_answer: bool,
    pub truncation: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub z: bool,
    pub authentic_data: bool,
    pub checking_disabled: bool,
    pub rcode: ResponseCode,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl DnsHeader {
    pub fn query(id: u16, recursion_desired: bool) -> Self {
        Self {
            id,
            recursion_desired,
            ..Self::default()
        }
    }

    pub fn flags(&self) -> u16 {
        let mut high = u8::from(self.is_response) << 7;
        high |= self.opcode.to_u8() << 3;
        high |= u8::from(self.authoritative_answer) << 2;
        high |= u8::from(self.truncation) << 1;
        high |= u8::from(self.recursion_desired);

        let mut low = u8::from(self.recursion_available) << 7;
        low |= u8::from(self.z) << 6;
        low |= u8::from(self.authentic_data) << 5;
        low |= u8::from(self.checking_disabled) << 4;
        low |= self.rcode.to_u8();

        u16::from_be_bytes([high, low])
    }

    fn set_flags(&mut self, flags: u16) {
        let [high, low] = flags.to_be_bytes();
        self.is_response = high & 0x80 != 0;
        self.opcode = OpCode::from_u8((high >> 3) & 0x0F);
        self.authoritative_answer = high & 0x04 != 0;
        self.truncation = high & 0x02 != 0;
        self.recursion_desired = high & 0x01 != 0;
        self.recursion_available = low & 0x80 != 0;
        self.z = low & 0x40 != 0;
        self.authentic_data = low & 0x20 != 0;
        self.checking_disabled = low & 0x10 != 0;
        self.rcode = ResponseCode::from_u8(low & 0x0F);
    }

    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, DomainError> {
        let mut header = DnsHeader {
            id: reader.read_u16()?,
            ..Self::default()
        };
        header.set_flags(reader.read_u16()?);
        header.qdcount = reader.read_u16()?;
        header.ancount = reader.read_u16()?;
        header.nscount = reader.read_u16()?;
        header.arcount = reader.read_u16()?;
        Ok(header)
    }

    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_u16(self.id);
        writer.write_u16(self.flags());
        writer.write_u16(self.qdcount);
        writer.write_u16(self.ancount);
        writer.write_u16(self.nscount);
        writer.write_u16(self.arcount);
    }
}

impl Default for DnsHeader {
    fn default() -> Self {
        Self {
            id: 0,
            is_response: false,
            opcode: OpCode::StandardQuery,
            authoritative_answer: false,
            truncation: false,
            recursion_desired: false,
            recursion_available: false,
            z: false,
            authentic_data: false,
            checking_disabled: false,
            rcode: ResponseCode::NoError,
            qdcount: 0,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        }
    }
}
