use super::header::{DnsHeader, HEADER_LENGTH};
use super::question::DnsQuestionRecord;
use super::record::DnsResourceRecord;
use super::wire::{WireReader, WireWriter};
use crate::dns_protocol::{DnsTransportProtocol, NameServerAddress};
use crate::DomainError;
use bytes::{BufMut, Bytes, BytesMut};
use std::time::Duration;

/// Where a response came from and what it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsDatagramMetadata {
    pub server: NameServerAddress,
    pub protocol: DnsTransportProtocol,
    pub size: usize,
    pub rtt: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DnsDatagram {
    pub header: DnsHeader,
    pub question: Vec<DnsQuestionRecord>,
    pub answer: Vec<DnsResourceRecord>,
    pub authority: Vec<DnsResourceRecord>,
    pub additional: Vec<DnsResourceRecord>,
    pub metadata: Option<DnsDatagramMetadata>,
}

impl DnsDatagram {
    /// Builds a datagram whose header counts match the given sections.
    pub fn new(
        header: DnsHeader,
        question: Vec<DnsQuestionRecord>,
        answer: Vec<DnsResourceRecord>,
        authority: Vec<DnsResourceRecord>,
        additional: Vec<DnsResourceRecord>,
    ) -> Self {
        let mut datagram = Self {
            header,
            question,
            answer,
            authority,
            additional,
            metadata: None,
        };
        datagram.sync_counts();
        datagram
    }

    pub fn query(id: u16, question: DnsQuestionRecord, recursion_desired: bool) -> Self {
        Self::new(
            DnsHeader::query(id, recursion_desired),
            vec![question],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    fn sync_counts(&mut self) {
        self.header.qdcount = self.question.len() as u16;
        self.header.ancount = self.answer.len() as u16;
        self.header.nscount = self.authority.len() as u16;
        self.header.arcount = self.additional.len() as u16;
    }

    pub fn id(&self) -> u16 {
        self.header.id
    }

    pub fn is_truncated(&self) -> bool {
        self.header.truncation
    }

    /// Parses one message; sections are sized by the header counts.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DomainError> {
        let mut reader = WireReader::new(bytes);
        let header = DnsHeader::read(&mut reader)?;

        let mut question = Vec::with_capacity(usize::from(header.qdcount).min(16));
        for _ in 0..header.qdcount {
            question.push(DnsQuestionRecord::read(&mut reader)?);
        }
        let answer = read_section(&mut reader, header.ancount)?;
        let authority = read_section(&mut reader, header.nscount)?;
        let additional = read_section(&mut reader, header.arcount)?;

        Ok(Self {
            header,
            question,
            answer,
            authority,
            additional,
            metadata: None,
        })
    }

    /// Serializes the message with name compression. Header counts are taken
    /// from the sections, never from stale header fields.
    pub fn to_bytes(&self) -> Result<Bytes, DomainError> {
        let mut header = self.header.clone();
        header.qdcount = section_count(self.question.len())?;
        header.ancount = section_count(self.answer.len())?;
        header.nscount = section_count(self.authority.len())?;
        header.arcount = section_count(self.additional.len())?;

        let mut writer = WireWriter::new(512);
        header.write(&mut writer);
        for question in &self.question {
            question.write(&mut writer)?;
        }
        for record in self
            .answer
            .iter()
            .chain(&self.authority)
            .chain(&self.additional)
        {
            record.write(&mut writer)?;
        }

        debug_assert!(writer.len() >= HEADER_LENGTH);
        Ok(writer.freeze())
    }

    /// The message prefixed with its 2-byte big-endian length, as sent over TCP.
    pub fn to_tcp_frame(&self) -> Result<Bytes, DomainError> {
        let message = self.to_bytes()?;
        let length = u16::try_from(message.len()).map_err(|_| DomainError::MessageTooLarge {
            size: message.len(),
            max: usize::from(u16::MAX),
        })?;
        let mut frame = BytesMut::with_capacity(message.len() + 2);
        frame.put_u16(length);
        frame.extend_from_slice(&message);
        Ok(frame.freeze())
    }

    /// Parses one length-prefixed message and returns it with the number of
    /// bytes consumed. Bytes past the frame are left alone.
    pub fn read_tcp_frame(buf: &[u8]) -> Result<(Self, usize), DomainError> {
        let mut reader = WireReader::new(buf);
        let length = usize::from(reader.read_u16()?);
        let message = reader.read_bytes(length)?;
        Ok((Self::from_bytes(message)?, length + 2))
    }

    /// Calls `set_expiry` on every record in every section.
    pub fn set_expiry(&mut self) {
        for record in self
            .answer
            .iter_mut()
            .chain(self.authority.iter_mut())
            .chain(self.additional.iter_mut())
        {
            record.set_expiry();
        }
    }
}

fn read_section(
    reader: &mut WireReader<'_>,
    count: u16,
) -> Result<Vec<DnsResourceRecord>, DomainError> {
    let mut records = Vec::with_capacity(usize::from(count).min(64));
    for _ in 0..count {
        records.push(DnsResourceRecord::read(reader)?);
    }
    Ok(records)
}

fn section_count(len: usize) -> Result<u16, DomainError> {
    u16::try_from(len).map_err(|_| DomainError::MessageTooLarge {
        size: len,
        max: usize::from(u16::MAX),
    })
}
