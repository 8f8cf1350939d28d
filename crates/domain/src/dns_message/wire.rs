//! Wire format cursor and writer.
//!
//! All integers are big-endian. The reader never reads past the end of its
//! buffer; every overrun surfaces as [`DomainError::EndOfStream`].

use crate::DomainError;
use bytes::{BufMut, Bytes, BytesMut};

/// Compression pointers carry a 14-bit offset.
const MAX_POINTER_OFFSET: usize = 0x3FFF;

/// A bounds-checked cursor over one DNS message.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, DomainError> {
        let value = self.byte_at(self.pos)?;
        self.pos += 1;
        Ok(value)
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, DomainError> {
        let bytes = self.slice_at(self.pos, 2)?;
        let value = u16::from_be_bytes([bytes[0], bytes[1]]);
        self.pos += 2;
        Ok(value)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, DomainError> {
        let bytes = self.slice_at(self.pos, 4)?;
        let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        self.pos += 4;
        Ok(value)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DomainError> {
        let slice = self.slice_at(self.pos, len)?;
        self.pos += len;
        Ok(slice)
    }

    #[inline]
    pub fn byte_at(&self, offset: usize) -> Result<u8, DomainError> {
        self.data
            .get(offset)
            .copied()
            .ok_or(DomainError::EndOfStream { offset })
    }

    #[inline]
    pub fn slice_at(&self, offset: usize, len: usize) -> Result<&'a [u8], DomainError> {
        let end = offset
            .checked_add(len)
            .ok_or(DomainError::EndOfStream { offset })?;
        self.data
            .get(offset..end)
            .ok_or(DomainError::EndOfStream { offset: end })
    }
}

/// Serializes one DNS message.
///
/// Holds the compression table for the message being written: every domain
/// suffix encoded so far, with the offset its labels start at.
#[derive(Debug)]
pub struct WireWriter {
    buf: BytesMut,
    names: Vec<(u16, String)>,
    compress: bool,
}

impl WireWriter {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            names: Vec::new(),
            compress: true,
        }
    }

    /// Writer that always emits full label sequences.
    pub fn without_compression(capacity: usize) -> Self {
        Self {
            compress: false,
            ..Self::new(capacity)
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Reserves a big-endian u16 to be filled in later with [`Self::patch_u16`].
    pub fn placeholder_u16(&mut self) -> usize {
        let pos = self.buf.len();
        self.buf.put_u16(0);
        pos
    }

    pub fn patch_u16(&mut self, pos: usize, value: u16) {
        self.buf[pos..pos + 2].copy_from_slice(&value.to_be_bytes());
    }

    pub(crate) fn lookup_name(&self, domain: &str) -> Option<u16> {
        if !self.compress {
            return None;
        }
        self.names
            .iter()
            .find(|(_, known)| known.eq_ignore_ascii_case(domain))
            .map(|(offset, _)| *offset)
    }

    pub(crate) fn remember_name(&mut self, domain: &str) {
        let pos = self.buf.len();
        if self.compress && pos <= MAX_POINTER_OFFSET {
            self.names.push((pos as u16, domain.to_string()));
        }
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}
