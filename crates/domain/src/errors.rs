use crate::dns_record::ResponseCode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unexpected end of stream at offset {offset}")]
    EndOfStream { offset: usize },

    #[error("Label too long: {length} bytes exceeds maximum of 63")]
    LabelTooLong { length: usize },

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Corrupt or cyclic compression pointer at offset {offset}")]
    CompressionLoop { offset: usize },

    #[error("Address family not supported: {0}")]
    UnsupportedAddressFamily(String),

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Response ID {received:#06x} does not match request ID {expected:#06x}")]
    ResponseIdMismatch { expected: u16, received: u16 },

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Transport timeout connecting to {server}")]
    TransportTimeout { server: String },

    #[error("Transport connection refused by {server}")]
    TransportConnectionRefused { server: String },

    #[error("Transport connection reset by {server}")]
    TransportConnectionReset { server: String },

    #[error("No name servers available")]
    NoNameServers,

    #[error("DNS resolution failed after {attempts} attempts")]
    ResolutionFailed { attempts: usize },

    #[error("Domain name does not exist (NXDOMAIN): {domain}")]
    NameError { domain: String },

    #[error("DNS server returned {rcode}")]
    ServerFailure { rcode: ResponseCode },

    #[error("Exceeded hop count of {hops} while resolving")]
    HopCountExceeded { hops: u32 },

    #[error("Key already exists")]
    KeyAlreadyExists,

    #[error("Key not found")]
    KeyNotFound,
}

impl DomainError {
    /// Errors worth retrying against the next server.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            DomainError::IoError(_)
                | DomainError::TransportTimeout { .. }
                | DomainError::TransportConnectionRefused { .. }
                | DomainError::TransportConnectionReset { .. }
                | DomainError::ResponseIdMismatch { .. }
        )
    }

    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            DomainError::EndOfStream { .. }
                | DomainError::LabelTooLong { .. }
                | DomainError::InvalidLabel(_)
                | DomainError::CompressionLoop { .. }
                | DomainError::UnsupportedAddressFamily(_)
                | DomainError::MessageTooLarge { .. }
        )
    }
}
