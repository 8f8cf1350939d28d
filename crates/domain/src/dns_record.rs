pub mod codes;
pub mod record_type;

pub use codes::{OpCode, ResponseCode};
pub use record_type::{RecordClass, RecordType};
