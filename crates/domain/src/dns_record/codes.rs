use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    StandardQuery,
    InverseQuery,
    ServerStatusRequest,
    Notify,
    Update,
    Unknown(u8),
}

impl OpCode {
    /// Four-bit wire value.
    pub fn to_u8(&self) -> u8 {
        match self {
            OpCode::StandardQuery => 0,
            OpCode::InverseQuery => 1,
            OpCode::ServerStatusRequest => 2,
            OpCode::Notify => 4,
            OpCode::Update => 5,
            OpCode::Unknown(code) => *code & 0x0F,
        }
    }

    pub fn from_u8(code: u8) -> Self {
        match code & 0x0F {
            0 => OpCode::StandardQuery,
            1 => OpCode::InverseQuery,
            2 => OpCode::ServerStatusRequest,
            4 => OpCode::Notify,
            5 => OpCode::Update,
            other => OpCode::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Unknown(u8),
}

impl ResponseCode {
    /// Four-bit wire value.
    pub fn to_u8(&self) -> u8 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormatError => 1,
            ResponseCode::ServerFailure => 2,
            ResponseCode::NameError => 3,
            ResponseCode::NotImplemented => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Unknown(code) => *code & 0x0F,
        }
    }

    pub fn from_u8(code: u8) -> Self {
        match code & 0x0F {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            other => ResponseCode::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCode::NoError => "NOERROR",
            ResponseCode::FormatError => "FORMERR",
            ResponseCode::ServerFailure => "SERVFAIL",
            ResponseCode::NameError => "NXDOMAIN",
            ResponseCode::NotImplemented => "NOTIMP",
            ResponseCode::Refused => "REFUSED",
            ResponseCode::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Unknown(code) => write!(f, "RCODE{}", code),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
