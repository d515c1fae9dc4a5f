//! Protocol-level error types.

use thiserror::Error;

/// Errors raised while parsing or building TDS wire structures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The buffer ended before a complete structure could be read.
    #[error("unexpected end of buffer")]
    UnexpectedEof,

    /// A length-prefixed field claimed more bytes than were available.
    #[error("incomplete data: expected {expected} bytes, got {actual}")]
    IncompletePacket {
        /// Bytes the length prefix promised.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// A field carried a value outside its defined domain.
    #[error("invalid value {value} for field {field}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Offending raw value.
        value: u32,
    },

    /// A TYPE_INFO carried a type byte this implementation does not know.
    #[error("unknown TDS type id 0x{0:02X}")]
    UnknownType(u8),

    /// A feature id appeared twice in a FEATUREEXTACK list.
    #[error("duplicate feature extension id 0x{0:02X}")]
    DuplicateFeature(u8),

    /// A UTF-16 string on the wire was not valid.
    #[error("invalid string encoding in {0}")]
    StringEncoding(&'static str),
}
