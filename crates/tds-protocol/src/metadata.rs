//! TYPE_INFO and COLMETADATA structures.
//!
//! Every column and parameter on the wire is described by a `TYPE_INFO`
//! block: the type byte followed by type-specific length, precision, scale,
//! collation and schema information. When Always Encrypted is negotiated the
//! column descriptor additionally carries [`CryptoMetadata`] describing the
//! plaintext type hidden behind the ciphertext.

use bytes::{Buf, BufMut};

use crate::codec::{read_b_varchar, read_us_varchar, write_b_varchar, write_us_varchar};
use crate::collation::Collation;
use crate::crypto::{CekTable, CryptoMetadata};
use crate::error::ProtocolError;
use crate::types::{ColumnFlags, TypeId};

/// Declared length marking a `max` (PLP) column.
pub const MAX_LENGTH: u32 = 0xFFFF;

/// Highest scale accepted for `TIME`, `DATETIME2` and `DATETIMEOFFSET`.
pub const MAX_TIME_SCALE: u8 = 7;

/// Highest precision accepted for `DECIMAL`/`NUMERIC`.
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// Byte width of the time component for a fractional-second scale.
#[must_use]
pub const fn time_len(scale: u8) -> usize {
    match scale {
        0..=2 => 3,
        3..=4 => 4,
        _ => 5,
    }
}

/// Byte width (including the sign byte) of a decimal of the given precision.
#[must_use]
pub const fn decimal_len(precision: u8) -> u8 {
    match precision {
        0..=9 => 5,
        10..=19 => 9,
        20..=28 => 13,
        _ => 17,
    }
}

/// XML schema binding attached to a typed `XML` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlSchema {
    /// Database holding the schema collection.
    pub database: String,
    /// Owning schema of the collection.
    pub owning_schema: String,
    /// Schema collection name.
    pub collection: String,
}

/// CLR user-defined type identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdtInfo {
    /// Database holding the type.
    pub database: String,
    /// Schema holding the type.
    pub schema: String,
    /// Type name.
    pub type_name: String,
    /// Assembly-qualified CLR type name.
    pub assembly_qualified_name: String,
}

/// Decoded `TYPE_INFO` for a column or parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Wire type.
    pub type_id: TypeId,
    /// Declared size in bytes.
    ///
    /// Fixed-size types report their width, the scaled temporal types report
    /// their computed wire width and `max` columns carry [`MAX_LENGTH`].
    pub size: u32,
    /// Precision for `DECIMAL`/`NUMERIC`.
    pub precision: u8,
    /// Scale for `DECIMAL`/`NUMERIC` and the scaled temporal types.
    pub scale: u8,
    /// Collation for character types.
    pub collation: Option<Collation>,
    /// Schema binding for typed XML.
    pub xml_schema: Option<XmlSchema>,
    /// CLR type information for UDT columns.
    pub udt: Option<UdtInfo>,
}

impl TypeInfo {
    /// Create type info with an explicit size.
    #[must_use]
    pub fn new(type_id: TypeId, size: u32) -> Self {
        Self {
            type_id,
            size,
            precision: 0,
            scale: 0,
            collation: None,
            xml_schema: None,
            udt: None,
        }
    }

    /// Create type info for a fixed-size type.
    #[must_use]
    pub fn fixed(type_id: TypeId) -> Self {
        Self::new(type_id, type_id.fixed_size().unwrap_or(0) as u32)
    }

    /// Create `DECIMALN` type info.
    #[must_use]
    pub fn decimal(precision: u8, scale: u8) -> Self {
        Self {
            precision,
            scale,
            ..Self::new(TypeId::DecimalN, u32::from(decimal_len(precision)))
        }
    }

    /// Create type info for `TIME`, `DATETIME2` or `DATETIMEOFFSET`.
    #[must_use]
    pub fn scaled(type_id: TypeId, scale: u8) -> Self {
        Self {
            scale,
            ..Self::new(type_id, scaled_size(type_id, scale))
        }
    }

    /// Attach a collation.
    #[must_use]
    pub fn with_collation(mut self, collation: Collation) -> Self {
        self.collation = Some(collation);
        self
    }

    /// Whether values travel as partially length-prefixed chunks.
    #[must_use]
    pub fn is_plp(&self) -> bool {
        match self.type_id {
            TypeId::Xml => true,
            TypeId::Udt => self.size == MAX_LENGTH,
            id if id.is_ushort_len() => self.size == MAX_LENGTH,
            _ => false,
        }
    }

    /// Decode a `TYPE_INFO` block, starting at the type byte.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < 1 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let raw = src.get_u8();
        let type_id = TypeId::from_u8(raw).ok_or(ProtocolError::UnknownType(raw))?;
        let mut info = Self::fixed(type_id);

        match type_id {
            TypeId::Null
            | TypeId::Int1
            | TypeId::Bit
            | TypeId::Int2
            | TypeId::Int4
            | TypeId::Int8
            | TypeId::Float4
            | TypeId::Float8
            | TypeId::Money
            | TypeId::Money4
            | TypeId::DateTime
            | TypeId::DateTime4
            | TypeId::Date => {}

            TypeId::Guid
            | TypeId::IntN
            | TypeId::BitN
            | TypeId::FloatN
            | TypeId::MoneyN
            | TypeId::DateTimeN
            | TypeId::Binary
            | TypeId::VarBinary => {
                info.size = u32::from(get_u8(src)?);
            }

            TypeId::Char | TypeId::VarChar => {
                info.size = u32::from(get_u8(src)?);
                info.collation = Some(Collation::decode(src)?);
            }

            TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN => {
                if src.remaining() < 3 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                info.size = u32::from(src.get_u8());
                info.precision = src.get_u8();
                info.scale = src.get_u8();
                if info.precision > MAX_DECIMAL_PRECISION {
                    return Err(ProtocolError::InvalidField {
                        field: "precision",
                        value: u32::from(info.precision),
                    });
                }
            }

            TypeId::Time | TypeId::DateTime2 | TypeId::DateTimeOffset => {
                let scale = get_u8(src)?;
                if scale > MAX_TIME_SCALE {
                    return Err(ProtocolError::InvalidField {
                        field: "scale",
                        value: u32::from(scale),
                    });
                }
                info.scale = scale;
                info.size = scaled_size(type_id, scale);
            }

            TypeId::BigVarChar | TypeId::BigChar | TypeId::NChar | TypeId::NVarChar => {
                info.size = u32::from(get_u16(src)?);
                info.collation = Some(Collation::decode(src)?);
            }

            TypeId::BigVarBinary | TypeId::BigBinary => {
                info.size = u32::from(get_u16(src)?);
            }

            TypeId::Text | TypeId::NText => {
                info.size = get_u32(src)?;
                info.collation = Some(Collation::decode(src)?);
            }

            TypeId::Image | TypeId::Variant => {
                info.size = get_u32(src)?;
            }

            TypeId::Xml => {
                info.size = MAX_LENGTH;
                if get_u8(src)? != 0 {
                    info.xml_schema = Some(XmlSchema {
                        database: read_b_varchar(src)?,
                        owning_schema: read_b_varchar(src)?,
                        collection: read_us_varchar(src)?,
                    });
                }
            }

            TypeId::Udt => {
                info.size = u32::from(get_u16(src)?);
                info.udt = Some(UdtInfo {
                    database: read_b_varchar(src)?,
                    schema: read_b_varchar(src)?,
                    type_name: read_b_varchar(src)?,
                    assembly_qualified_name: read_us_varchar(src)?,
                });
            }
        }

        Ok(info)
    }

    /// Encode this `TYPE_INFO` block, starting with the type byte.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.type_id as u8);

        match self.type_id {
            TypeId::Guid
            | TypeId::IntN
            | TypeId::BitN
            | TypeId::FloatN
            | TypeId::MoneyN
            | TypeId::DateTimeN
            | TypeId::Binary
            | TypeId::VarBinary => dst.put_u8(self.size as u8),

            TypeId::Char | TypeId::VarChar => {
                dst.put_u8(self.size as u8);
                self.collation.unwrap_or_default().encode(dst);
            }

            TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN => {
                dst.put_u8(self.size as u8);
                dst.put_u8(self.precision);
                dst.put_u8(self.scale);
            }

            TypeId::Time | TypeId::DateTime2 | TypeId::DateTimeOffset => dst.put_u8(self.scale),

            TypeId::BigVarChar | TypeId::BigChar | TypeId::NChar | TypeId::NVarChar => {
                dst.put_u16_le(self.size as u16);
                self.collation.unwrap_or_default().encode(dst);
            }

            TypeId::BigVarBinary | TypeId::BigBinary => dst.put_u16_le(self.size as u16),

            TypeId::Text | TypeId::NText => {
                dst.put_u32_le(self.size);
                self.collation.unwrap_or_default().encode(dst);
            }

            TypeId::Image | TypeId::Variant => dst.put_u32_le(self.size),

            TypeId::Xml => match &self.xml_schema {
                Some(schema) => {
                    dst.put_u8(1);
                    write_b_varchar(dst, &schema.database);
                    write_b_varchar(dst, &schema.owning_schema);
                    write_us_varchar(dst, &schema.collection);
                }
                None => dst.put_u8(0),
            },

            TypeId::Udt => {
                dst.put_u16_le(self.size as u16);
                let udt = self.udt.as_ref();
                write_b_varchar(dst, udt.map_or("", |u| u.database.as_str()));
                write_b_varchar(dst, udt.map_or("", |u| u.schema.as_str()));
                write_b_varchar(dst, udt.map_or("", |u| u.type_name.as_str()));
                write_us_varchar(dst, udt.map_or("", |u| u.assembly_qualified_name.as_str()));
            }

            _ => {}
        }
    }
}

fn scaled_size(type_id: TypeId, scale: u8) -> u32 {
    let time = time_len(scale) as u32;
    match type_id {
        TypeId::DateTime2 => time + 3,
        TypeId::DateTimeOffset => time + 5,
        _ => time,
    }
}

fn get_u8(src: &mut impl Buf) -> Result<u8, ProtocolError> {
    if src.remaining() < 1 {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(src.get_u8())
}

fn get_u16(src: &mut impl Buf) -> Result<u16, ProtocolError> {
    if src.remaining() < 2 {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(src.get_u16_le())
}

fn get_u32(src: &mut impl Buf) -> Result<u32, ProtocolError> {
    if src.remaining() < 4 {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(src.get_u32_le())
}

/// A column definition from COLMETADATA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// User type ID.
    pub user_type: u32,
    /// Column flags.
    pub flags: ColumnFlags,
    /// Wire type. For encrypted columns this is the ciphertext type.
    pub type_info: TypeInfo,
    /// Multi-part table name for `TEXT`, `NTEXT` and `IMAGE` columns.
    pub table_name: Vec<String>,
    /// Encryption metadata for encrypted columns.
    pub crypto_metadata: Option<CryptoMetadata>,
}

impl ColumnDescriptor {
    /// Create a plaintext column.
    #[must_use]
    pub fn new(name: impl Into<String>, type_info: TypeInfo) -> Self {
        Self {
            name: name.into(),
            user_type: 0,
            flags: ColumnFlags::NULLABLE,
            type_info,
            table_name: Vec::new(),
            crypto_metadata: None,
        }
    }

    /// Create an encrypted column with a `varbinary` ciphertext type.
    #[must_use]
    pub fn encrypted(name: impl Into<String>, crypto_metadata: CryptoMetadata) -> Self {
        Self {
            flags: ColumnFlags::NULLABLE | ColumnFlags::ENCRYPTED,
            crypto_metadata: Some(crypto_metadata),
            ..Self::new(name, TypeInfo::new(TypeId::BigVarBinary, 8000))
        }
    }

    /// Whether the column carries encrypted values.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.flags.is_encrypted()
    }

    /// The column's type as the application sees it.
    ///
    /// Encrypted columns report the type from their crypto metadata rather
    /// than the ciphertext type.
    #[must_use]
    pub fn original_type_info(&self) -> &TypeInfo {
        match &self.crypto_metadata {
            Some(meta) if self.is_encrypted() => &meta.base_type,
            _ => &self.type_info,
        }
    }

    fn decode(src: &mut impl Buf, column_encryption: bool) -> Result<Self, ProtocolError> {
        // UserType (4 bytes) + Flags (2 bytes)
        if src.remaining() < 6 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let user_type = src.get_u32_le();
        let flags = ColumnFlags::from_bits_retain(src.get_u16_le());
        let type_info = TypeInfo::decode(src)?;

        let mut table_name = Vec::new();
        if type_info.type_id.is_text_ptr() {
            let parts = get_u8(src)?;
            for _ in 0..parts {
                table_name.push(read_us_varchar(src)?);
            }
        }

        let crypto_metadata = if flags.is_encrypted() {
            if !column_encryption {
                return Err(ProtocolError::InvalidField {
                    field: "column_flags",
                    value: u32::from(flags.bits()),
                });
            }
            Some(CryptoMetadata::decode(src)?)
        } else {
            None
        };

        let name = read_b_varchar(src)?;

        Ok(Self {
            name,
            user_type,
            flags,
            type_info,
            table_name,
            crypto_metadata,
        })
    }

    fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.user_type);
        dst.put_u16_le(self.flags.bits());
        self.type_info.encode(dst);
        if self.type_info.type_id.is_text_ptr() {
            dst.put_u8(self.table_name.len() as u8);
            for part in &self.table_name {
                write_us_varchar(dst, part);
            }
        }
        if let Some(meta) = self.crypto_metadata.as_ref().filter(|_| self.is_encrypted()) {
            meta.encode(dst);
        }
        write_b_varchar(dst, &self.name);
    }
}

/// COLMETADATA token body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColMetaData {
    /// Keys referenced by encrypted columns. Empty unless column encryption
    /// was negotiated.
    pub cek_table: CekTable,
    /// Column definitions in result-set order.
    pub columns: Vec<ColumnDescriptor>,
}

impl ColMetaData {
    /// Special value indicating no metadata.
    pub const NO_METADATA: u16 = 0xFFFF;

    /// Decode a COLMETADATA token body (without the token byte).
    ///
    /// `column_encryption` states whether the session negotiated Always
    /// Encrypted, which adds a CEK table and per-column crypto metadata.
    pub fn decode(src: &mut impl Buf, column_encryption: bool) -> Result<Self, ProtocolError> {
        let column_count = get_u16(src)?;

        if column_count == Self::NO_METADATA {
            return Ok(Self::default());
        }

        let cek_table = if column_encryption {
            CekTable::decode(src)?
        } else {
            CekTable::new()
        };

        // Each column needs at least user type, flags, type byte and name length.
        let mut columns = Vec::with_capacity((column_count as usize).min(src.remaining() / 8));
        for _ in 0..column_count {
            columns.push(ColumnDescriptor::decode(src, column_encryption)?);
        }

        Ok(Self { cek_table, columns })
    }

    /// Encode a COLMETADATA token body (without the token byte).
    pub fn encode(&self, dst: &mut impl BufMut, column_encryption: bool) {
        dst.put_u16_le(self.columns.len() as u16);
        if column_encryption {
            self.cek_table.encode(dst);
        }
        for column in &self.columns {
            column.encode(dst);
        }
    }

    /// Get the number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Whether any column is encrypted.
    #[must_use]
    pub fn has_encrypted_columns(&self) -> bool {
        self.columns.iter().any(ColumnDescriptor::is_encrypted)
    }
}
