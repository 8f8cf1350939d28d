//! Domain name label encoding with message compression (RFC 1035 §4.1.4).

use super::wire::{WireReader, WireWriter};
use crate::DomainError;
use smallvec::SmallVec;
use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

pub const MAX_LABEL_LENGTH: usize = 63;

const POINTER_MASK: u8 = 0xC0;

/// Upper bound on pointer jumps while decoding a single name.
const MAX_POINTER_JUMPS: usize = 128;

impl WireWriter {
    /// Writes `domain` as a label sequence, replacing the longest previously
    /// written suffix with a compression pointer.
    ///
    /// Every label is validated before anything is written.
    pub fn write_domain(&mut self, domain: &str) -> Result<(), DomainError> {
        let domain = domain.strip_suffix('.').unwrap_or(domain);
        if domain.is_empty() {
            self.write_u8(0);
            return Ok(());
        }

        let labels: SmallVec<[&str; 8]> = domain.split('.').collect();
        for label in &labels {
            validate_label(label)?;
        }

        let mut rest = domain;
        for label in labels {
            if let Some(offset) = self.lookup_name(rest) {
                self.write_u16(0xC000 | offset);
                return Ok(());
            }
            self.remember_name(rest);
            self.write_u8(label.len() as u8);
            self.write_bytes(label.as_bytes());
            rest = rest.get(label.len() + 1..).unwrap_or("");
        }

        self.write_u8(0);
        Ok(())
    }
}

impl WireReader<'_> {
    /// Reads a possibly compressed domain name, without the trailing dot.
    ///
    /// Pointers must point strictly backwards; anything else is rejected as a
    /// loop, as is a chain of more than `MAX_POINTER_JUMPS` pointers.
    pub fn read_domain(&mut self) -> Result<String, DomainError> {
        let mut name = String::new();
        let mut pos = self.position();
        let mut resume_at = None;
        let mut jumps = 0;

        loop {
            let len = self.byte_at(pos)?;
            match len & POINTER_MASK {
                POINTER_MASK => {
                    let low = self.byte_at(pos + 1)?;
                    let target = (usize::from(len & 0x3F) << 8) | usize::from(low);
                    if target >= pos || jumps >= MAX_POINTER_JUMPS {
                        return Err(DomainError::CompressionLoop { offset: pos });
                    }
                    resume_at.get_or_insert(pos + 2);
                    jumps += 1;
                    pos = target;
                }
                0x00 if len == 0 => {
                    resume_at.get_or_insert(pos + 1);
                    break;
                }
                0x00 => {
                    let label = self.slice_at(pos + 1, usize::from(len))?;
                    if !label.is_ascii() {
                        return Err(DomainError::InvalidLabel(format!(
                            "non-ASCII label at offset {}",
                            pos
                        )));
                    }
                    for &byte in label {
                        name.push(char::from(byte));
                    }
                    name.push('.');
                    pos += 1 + usize::from(len);
                }
                _ => {
                    return Err(DomainError::LabelTooLong {
                        length: usize::from(len),
                    })
                }
            }
        }

        if let Some(resume_at) = resume_at {
            self.set_position(resume_at);
        }
        name.pop();
        Ok(name)
    }
}

fn validate_label(label: &str) -> Result<(), DomainError> {
    if label.len() > MAX_LABEL_LENGTH {
        return Err(DomainError::LabelTooLong {
            length: label.len(),
        });
    }
    if label.is_empty() {
        return Err(DomainError::InvalidLabel("empty label".to_string()));
    }
    if !label.is_ascii() {
        return Err(DomainError::InvalidLabel(format!(
            "non-ASCII label '{}'",
            label
        )));
    }
    Ok(())
}

/// Builds the `in-addr.arpa` / `ip6.arpa` name used for PTR lookups.
pub fn reverse_domain(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{}.{}.{}.{}.in-addr.arpa", d, c, b, a)
        }
        IpAddr::V6(v6) => {
            let mut name = String::with_capacity(72);
            for byte in v6.octets().iter().rev() {
                let _ = write!(name, "{:x}.{:x}.", byte & 0x0F, byte >> 4);
            }
            name.push_str("ip6.arpa");
            name
        }
    }
}

/// Inverse of [`reverse_domain`].
pub fn parse_reverse_domain(domain: &str) -> Result<IpAddr, DomainError> {
    let lower = domain.trim_end_matches('.').to_ascii_lowercase();

    if let Some(prefix) = lower.strip_suffix(".in-addr.arpa") {
        let octets: SmallVec<[u8; 4]> = prefix
            .split('.')
            .rev()
            .map(|part| part.parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|_| DomainError::InvalidIpAddress(domain.to_string()))?;
        let octets: [u8; 4] = octets
            .as_slice()
            .try_into()
            .map_err(|_| DomainError::InvalidIpAddress(domain.to_string()))?;
        return Ok(IpAddr::V4(Ipv4Addr::from(octets)));
    }

    if let Some(prefix) = lower.strip_suffix(".ip6.arpa") {
        let nibbles: SmallVec<[u8; 32]> = prefix
            .split('.')
            .rev()
            .map(|part| u8::from_str_radix(part, 16).ok().filter(|_| part.len() == 1))
            .collect::<Option<_>>()
            .ok_or_else(|| DomainError::InvalidIpAddress(domain.to_string()))?;
        if nibbles.len() != 32 {
            return Err(DomainError::InvalidIpAddress(domain.to_string()));
        }
        let mut octets = [0u8; 16];
        for (i, pair) in nibbles.chunks(2).enumerate() {
            octets[i] = (pair[0] << 4) | pair[1];
        }
        return Ok(IpAddr::V6(Ipv6Addr::from(octets)));
    }

    Err(DomainError::UnsupportedAddressFamily(domain.to_string()))
}
