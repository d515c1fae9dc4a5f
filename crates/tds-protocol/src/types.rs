//! TDS data type definitions.
//!
//! This module defines the SQL Server data types as they appear in the TDS protocol.

use bitflags::bitflags;

/// TDS data type identifiers.
///
/// These correspond to the type bytes sent in column metadata and parameter definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeId {
    // Fixed-length types (no length prefix)
    /// Null type.
    Null = 0x1F,
    /// 8-bit unsigned integer (`TINYINT`).
    Int1 = 0x30,
    /// Bit (boolean).
    Bit = 0x32,
    /// 16-bit signed integer.
    Int2 = 0x34,
    /// 32-bit signed integer.
    Int4 = 0x38,
    /// 64-bit signed integer.
    Int8 = 0x7F,
    /// 32-bit floating point.
    Float4 = 0x3B,
    /// 64-bit floating point.
    Float8 = 0x3E,
    /// 8-byte money.
    Money = 0x3C,
    /// 4-byte money.
    Money4 = 0x7A,
    /// 8-byte datetime.
    DateTime = 0x3D,
    /// 4-byte small datetime.
    DateTime4 = 0x3A,

    // Variable-length types (with length prefix)
    /// Variable-length GUID.
    Guid = 0x24,
    /// Variable-length integer.
    IntN = 0x26,
    /// Legacy decimal.
    Decimal = 0x37,
    /// Legacy numeric.
    Numeric = 0x3F,
    /// Variable-length bit.
    BitN = 0x68,
    /// Variable-length decimal.
    DecimalN = 0x6A,
    /// Variable-length numeric.
    NumericN = 0x6C,
    /// Variable-length float.
    FloatN = 0x6D,
    /// Variable-length money.
    MoneyN = 0x6E,
    /// Variable-length datetime (4 or 8 bytes).
    DateTimeN = 0x6F,

    // Byte-counted types
    /// Legacy fixed-length character.
    Char = 0x2F,
    /// Legacy variable-length character.
    VarChar = 0x27,
    /// Legacy fixed-length binary.
    Binary = 0x2D,
    /// Legacy variable-length binary.
    VarBinary = 0x25,

    // Counted types with 2-byte length
    /// Large variable-length character.
    BigVarChar = 0xA7,
    /// Large variable-length binary.
    BigVarBinary = 0xA5,
    /// Large fixed-length character.
    BigChar = 0xAF,
    /// Large fixed-length binary.
    BigBinary = 0xAD,

    // Unicode types
    /// Fixed-length Unicode character.
    NChar = 0xEF,
    /// Variable-length Unicode character.
    NVarChar = 0xE7,

    // Large object types
    /// Text (deprecated, use varchar(max)).
    Text = 0x23,
    /// Image (deprecated, use varbinary(max)).
    Image = 0x22,
    /// NText (deprecated, use nvarchar(max)).
    NText = 0x63,

    // Date/time types (SQL Server 2008+)
    /// Date (3 bytes).
    Date = 0x28,
    /// Time with variable precision.
    Time = 0x29,
    /// DateTime2 with variable precision.
    DateTime2 = 0x2A,
    /// DateTimeOffset with variable precision.
    DateTimeOffset = 0x2B,

    // Special types
    /// SQL Variant.
    Variant = 0x62,
    /// User-defined type.
    Udt = 0xF0,
    /// XML type.
    Xml = 0xF1,
}

impl TypeId {
    /// Create a type ID from a raw byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x1F => Some(Self::Null),
            0x30 => Some(Self::Int1),
            0x32 => Some(Self::Bit),
            0x34 => Some(Self::Int2),
            0x38 => Some(Self::Int4),
            0x7F => Some(Self::Int8),
            0x3B => Some(Self::Float4),
            0x3E => Some(Self::Float8),
            0x3C => Some(Self::Money),
            0x7A => Some(Self::Money4),
            0x3D => Some(Self::DateTime),
            0x3A => Some(Self::DateTime4),
            0x24 => Some(Self::Guid),
            0x26 => Some(Self::IntN),
            0x37 => Some(Self::Decimal),
            0x3F => Some(Self::Numeric),
            0x68 => Some(Self::BitN),
            0x6A => Some(Self::DecimalN),
            0x6C => Some(Self::NumericN),
            0x6D => Some(Self::FloatN),
            0x6E => Some(Self::MoneyN),
            0x6F => Some(Self::DateTimeN),
            0x2F => Some(Self::Char),
            0x27 => Some(Self::VarChar),
            0x2D => Some(Self::Binary),
            0x25 => Some(Self::VarBinary),
            0xA7 => Some(Self::BigVarChar),
            0xA5 => Some(Self::BigVarBinary),
            0xAF => Some(Self::BigChar),
            0xAD => Some(Self::BigBinary),
            0xEF => Some(Self::NChar),
            0xE7 => Some(Self::NVarChar),
            0x23 => Some(Self::Text),
            0x22 => Some(Self::Image),
            0x63 => Some(Self::NText),
            0x28 => Some(Self::Date),
            0x29 => Some(Self::Time),
            0x2A => Some(Self::DateTime2),
            0x2B => Some(Self::DateTimeOffset),
            0x62 => Some(Self::Variant),
            0xF0 => Some(Self::Udt),
            0xF1 => Some(Self::Xml),
            _ => None,
        }
    }

    /// Check if this is a fixed-length type.
    #[must_use]
    pub const fn is_fixed_length(&self) -> bool {
        matches!(
            self,
            Self::Null
                | Self::Int1
                | Self::Bit
                | Self::Int2
                | Self::Int4
                | Self::Int8
                | Self::Float4
                | Self::Float8
                | Self::Money
                | Self::Money4
                | Self::DateTime
                | Self::DateTime4
        )
    }

    /// Check if this is a variable-length type.
    #[must_use]
    pub const fn is_variable_length(&self) -> bool {
        !self.is_fixed_length()
    }

    /// Check if this type carries a 1-byte length prefix in row data.
    #[must_use]
    pub const fn is_byte_len(&self) -> bool {
        matches!(
            self,
            Self::Guid
                | Self::IntN
                | Self::Decimal
                | Self::Numeric
                | Self::BitN
                | Self::DecimalN
                | Self::NumericN
                | Self::FloatN
                | Self::MoneyN
                | Self::DateTimeN
                | Self::Char
                | Self::VarChar
                | Self::Binary
                | Self::VarBinary
                | Self::Date
                | Self::Time
                | Self::DateTime2
                | Self::DateTimeOffset
        )
    }

    /// Check if this type carries a 2-byte length prefix in row data
    /// (or PLP chunks when declared `max`).
    #[must_use]
    pub const fn is_ushort_len(&self) -> bool {
        matches!(
            self,
            Self::BigVarChar
                | Self::BigVarBinary
                | Self::BigChar
                | Self::BigBinary
                | Self::NChar
                | Self::NVarChar
        )
    }

    /// Check if this is a legacy large-object type using a text pointer.
    #[must_use]
    pub const fn is_text_ptr(&self) -> bool {
        matches!(self, Self::Text | Self::Image | Self::NText)
    }

    /// Check if this is a Unicode ("wide") character type.
    #[must_use]
    pub const fn is_unicode(&self) -> bool {
        matches!(self, Self::NChar | Self::NVarChar | Self::NText | Self::Xml)
    }

    /// Check if this is a code-page ("narrow") character type.
    #[must_use]
    pub const fn is_narrow_char(&self) -> bool {
        matches!(
            self,
            Self::Char | Self::VarChar | Self::BigChar | Self::BigVarChar | Self::Text
        )
    }

    /// Check if this type's TYPE_INFO carries a collation.
    #[must_use]
    pub const fn has_collation(&self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::VarChar
                | Self::BigChar
                | Self::BigVarChar
                | Self::NChar
                | Self::NVarChar
                | Self::Text
                | Self::NText
        )
    }

    /// Check if this is a date/time type.
    #[must_use]
    pub const fn is_datetime(&self) -> bool {
        matches!(
            self,
            Self::DateTime
                | Self::DateTime4
                | Self::DateTimeN
                | Self::Date
                | Self::Time
                | Self::DateTime2
                | Self::DateTimeOffset
        )
    }

    /// Check if this type's TYPE_INFO carries a scale byte only.
    #[must_use]
    pub const fn is_scaled_temporal(&self) -> bool {
        matches!(self, Self::Time | Self::DateTime2 | Self::DateTimeOffset)
    }

    /// Get the fixed size of this type in bytes, if applicable.
    #[must_use]
    pub const fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Null => Some(0),
            Self::Int1 => Some(1),
            Self::Bit => Some(1),
            Self::Int2 => Some(2),
            Self::Int4 => Some(4),
            Self::Int8 => Some(8),
            Self::Float4 => Some(4),
            Self::Float8 => Some(8),
            Self::Money => Some(8),
            Self::Money4 => Some(4),
            Self::DateTime => Some(8),
            Self::DateTime4 => Some(4),
            Self::Date => Some(3),
            _ => None,
        }
    }
}

bitflags! {
    /// Column flags from COLMETADATA.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ColumnFlags: u16 {
        /// Column is nullable.
        const NULLABLE = 0x0001;
        /// Column allows case-sensitive comparison.
        const CASE_SENSITIVE = 0x0002;
        /// Column is read-write.
        const UPDATEABLE = 0x0004;
        /// Updateability unknown.
        const UPDATEABLE_UNKNOWN = 0x0008;
        /// Column is an identity column.
        const IDENTITY = 0x0010;
        /// Column is computed.
        const COMPUTED = 0x0020;
        /// Column has fixed-length CLR type.
        const FIXED_LEN_CLR_TYPE = 0x0100;
        /// Column is a sparse column set.
        const SPARSE_COLUMN_SET = 0x0400;
        /// Column is encrypted (Always Encrypted).
        const ENCRYPTED = 0x0800;
        /// Column is hidden.
        const HIDDEN = 0x2000;
        /// Column is a key column.
        const KEY = 0x4000;
        /// Column is nullable but unknown at query time.
        const NULLABLE_UNKNOWN = 0x8000;
    }
}

/// Update mode for a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Updateable {
    /// Column is read-only.
    #[default]
    ReadOnly,
    /// Column is read-write.
    ReadWrite,
    /// Updateability unknown.
    Unknown,
}

impl ColumnFlags {
    /// Whether the column is encrypted.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.contains(Self::ENCRYPTED)
    }

    /// Whether the column is nullable.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.contains(Self::NULLABLE)
    }

    /// Decode the two updateability bits.
    #[must_use]
    pub const fn updateable(&self) -> Updateable {
        match (self.bits() >> 2) & 0x03 {
            0 => Updateable::ReadOnly,
            1 => Updateable::ReadWrite,
            _ => Updateable::Unknown,
        }
    }
}
