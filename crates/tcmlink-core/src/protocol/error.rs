//! Protocol errors

use thiserror::Error;

/// Errors that can occur during protocol communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid action code '{0}'")]
    InvalidAction(String),

    #[error("Read frame must carry the query marker, got '{0}'")]
    PayloadMismatch(String),

    #[error("Length mismatch: header declares {declared}, data has {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Checksum mismatch: expected {expected:03}, got {actual:03}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("Value '{value}' does not fit the {width}-character {field} field")]
    FieldTooLarge {
        field: &'static str,
        value: String,
        width: usize,
    },

    #[error("{field} must not be negative, got {value}")]
    NegativeValue { field: &'static str, value: i64 },

    #[error("Payload of {0} bytes exceeds the 99 byte limit")]
    PayloadTooLarge(usize),

    #[error("Field '{value}' has width {actual}, expected {expected}")]
    WrongFieldWidth {
        value: String,
        expected: usize,
        actual: usize,
    },

    #[error("Field '{0}' is not numeric")]
    NotNumeric(String),

    #[error("Unrecognized encoding '{0}'")]
    UnrecognizedEncoding(String),

    #[error("{converter} converter cannot handle value {value}")]
    UnsupportedValue {
        converter: &'static str,
        value: String,
    },

    #[error("Timed out while reading response")]
    CommunicationTimeout,

    #[error("Transport lock '{0}' is held by another process")]
    LockUnavailable(String),

    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
