//! Type conversion error types.

use tds_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur during type conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TypeError {
    /// Value is null when non-null was expected.
    #[error("unexpected null value")]
    UnexpectedNull,

    /// Type mismatch during conversion.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        actual: String,
    },

    /// Value is out of range for target type.
    #[error("value out of range for {target_type}")]
    OutOfRange {
        /// Target type name.
        target_type: &'static str,
    },

    /// The raw bytes are shorter (or longer) than the type requires.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes needed.
        needed: usize,
        /// Bytes available.
        available: usize,
    },

    /// A field width that the type does not allow.
    #[error("invalid length {length} for {type_name}")]
    InvalidLength {
        /// SQL type name.
        type_name: &'static str,
        /// Offending length.
        length: usize,
    },

    /// The wire type id is not supported by the codec.
    #[error("unsupported TDS type 0x{0:02X}")]
    UnsupportedType(u8),

    /// Unsupported type conversion.
    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion {
        /// Source type.
        from: String,
        /// Target type.
        to: &'static str,
    },

    /// Invalid date/time value.
    #[error("invalid date/time: {0}")]
    InvalidDateTime(String),

    /// Invalid encoding in string data.
    #[error("invalid string encoding: {0}")]
    InvalidEncoding(String),

    /// Malformed wire structure around a value.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl TypeError {
    /// Shorthand for a length check failure.
    pub(crate) fn short(needed: usize, available: usize) -> Self {
        Self::BufferTooSmall { needed, available }
    }
}
