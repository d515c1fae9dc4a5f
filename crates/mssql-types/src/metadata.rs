//! Column type reporting derived from a [`TypeInfo`].
//!
//! These answer the questions a result-set consumer asks about a column:
//! which Rust representation to scan into, the server's type name, the
//! declared length, precision and scale, and the T-SQL declaration used when
//! the type is sent back as a parameter.

use std::borrow::Cow;

use tds_protocol::{TypeId, TypeInfo, codec::utf16_byte_len, metadata::MAX_LENGTH};

use crate::error::TypeError;
use crate::value::SqlValue;

/// Reported length of `varchar(max)` and `varbinary(max)` columns.
pub const MAX_VARLEN_NARROW: i64 = 2_147_483_645;

/// Reported length of `nvarchar(max)` and `xml` columns.
pub const MAX_VARLEN_WIDE: i64 = 1_073_741_822;

/// Reported length of `text` and `image` columns.
pub const TEXT_LEN: i64 = 2_147_483_647;

/// Reported length of `ntext` columns.
pub const NTEXT_LEN: i64 = 1_073_741_823;

/// Largest non-`max` byte length of a variable-length column.
const MAX_INLINE_BYTES: u32 = 8000;

/// Scale used for temporal and decimal parameters built from values.
const DEFAULT_PARAM_SCALE: u8 = 7;

/// Precision used for decimal parameters built from values.
const DEFAULT_PARAM_PRECISION: u8 = 38;

/// The Rust representation a column naturally scans into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanType {
    /// Any integer width.
    Int64,
    /// `REAL` and `FLOAT`.
    Float64,
    /// `BIT`.
    Bool,
    /// Character and XML data.
    String,
    /// Raw bytes: binary, decimal, money, GUID and UDT columns.
    Bytes,
    /// The date/time family.
    DateTime,
    /// No fixed representation (`sql_variant`).
    Unknown,
}

fn invalid_size(type_name: &'static str, size: u32) -> TypeError {
    TypeError::InvalidLength {
        type_name,
        length: size as usize,
    }
}

/// Scan type for a column.
#[must_use]
pub fn scan_type(type_info: &TypeInfo) -> ScanType {
    match type_info.type_id {
        TypeId::Int1 | TypeId::Int2 | TypeId::Int4 | TypeId::Int8 | TypeId::IntN => ScanType::Int64,
        TypeId::Float4 | TypeId::Float8 | TypeId::FloatN => ScanType::Float64,
        TypeId::Bit | TypeId::BitN => ScanType::Bool,
        TypeId::Char
        | TypeId::VarChar
        | TypeId::BigChar
        | TypeId::BigVarChar
        | TypeId::NChar
        | TypeId::NVarChar
        | TypeId::Text
        | TypeId::NText
        | TypeId::Xml => ScanType::String,
        TypeId::DateTime
        | TypeId::DateTime4
        | TypeId::DateTimeN
        | TypeId::Date
        | TypeId::Time
        | TypeId::DateTime2
        | TypeId::DateTimeOffset => ScanType::DateTime,
        TypeId::Decimal
        | TypeId::Numeric
        | TypeId::DecimalN
        | TypeId::NumericN
        | TypeId::Money
        | TypeId::Money4
        | TypeId::MoneyN
        | TypeId::Guid
        | TypeId::Binary
        | TypeId::VarBinary
        | TypeId::BigBinary
        | TypeId::BigVarBinary
        | TypeId::Image
        | TypeId::Udt => ScanType::Bytes,
        TypeId::Variant | TypeId::Null => ScanType::Unknown,
    }
}

/// Upper-case server type name, e.g. `VARCHAR` or `SMALLMONEY`.
///
/// `*N` types resolve by their size; an unexpected size is an error.
pub fn database_type_name(type_info: &TypeInfo) -> Result<&str, TypeError> {
    let name = match type_info.type_id {
        TypeId::Null => "NULL",
        TypeId::Int1 => "TINYINT",
        TypeId::Int2 => "SMALLINT",
        TypeId::Int4 => "INT",
        TypeId::Int8 => "BIGINT",
        TypeId::IntN => match type_info.size {
            1 => "TINYINT",
            2 => "SMALLINT",
            4 => "INT",
            8 => "BIGINT",
            size => return Err(invalid_size("INTN", size)),
        },
        TypeId::Float4 => "REAL",
        TypeId::Float8 => "FLOAT",
        TypeId::FloatN => match type_info.size {
            4 => "REAL",
            8 => "FLOAT",
            size => return Err(invalid_size("FLOATN", size)),
        },
        TypeId::Bit | TypeId::BitN => "BIT",
        TypeId::Decimal | TypeId::DecimalN | TypeId::NumericN => "DECIMAL",
        TypeId::Numeric => "NUMERIC",
        TypeId::Money => "MONEY",
        TypeId::Money4 => "SMALLMONEY",
        TypeId::MoneyN => match type_info.size {
            4 => "SMALLMONEY",
            8 => "MONEY",
            size => return Err(invalid_size("MONEYN", size)),
        },
        TypeId::DateTime => "DATETIME",
        TypeId::DateTime4 => "SMALLDATETIME",
        TypeId::DateTimeN => match type_info.size {
            4 => "SMALLDATETIME",
            8 => "DATETIME",
            size => return Err(invalid_size("DATETIMEN", size)),
        },
        TypeId::Date => "DATE",
        TypeId::Time => "TIME",
        TypeId::DateTime2 => "DATETIME2",
        TypeId::DateTimeOffset => "DATETIMEOFFSET",
        TypeId::Guid => "UNIQUEIDENTIFIER",
        TypeId::Char | TypeId::BigChar => "CHAR",
        TypeId::VarChar | TypeId::BigVarChar => "VARCHAR",
        TypeId::NChar => "NCHAR",
        TypeId::NVarChar => "NVARCHAR",
        TypeId::Binary | TypeId::BigBinary => "BINARY",
        TypeId::VarBinary | TypeId::BigVarBinary => "VARBINARY",
        TypeId::Text => "TEXT",
        TypeId::NText => "NTEXT",
        TypeId::Image => "IMAGE",
        TypeId::Xml => "XML",
        TypeId::Variant => "SQL_VARIANT",
        TypeId::Udt => type_info
            .udt
            .as_ref()
            .map_or("UDT", |udt| udt.type_name.as_str()),
    };
    Ok(name)
}

/// Declared length of variable-length columns, in characters for text and
/// bytes for binary. `None` for types without a length.
#[must_use]
pub fn length(type_info: &TypeInfo) -> Option<i64> {
    let size = type_info.size;
    match type_info.type_id {
        TypeId::Char
        | TypeId::VarChar
        | TypeId::BigChar
        | TypeId::BigVarChar
        | TypeId::Binary
        | TypeId::VarBinary
        | TypeId::BigBinary
        | TypeId::BigVarBinary => Some(if size == MAX_LENGTH {
            MAX_VARLEN_NARROW
        } else {
            i64::from(size)
        }),
        TypeId::NChar | TypeId::NVarChar => Some(if size == MAX_LENGTH {
            MAX_VARLEN_WIDE
        } else {
            i64::from(size / 2)
        }),
        TypeId::Text | TypeId::Image => Some(TEXT_LEN),
        TypeId::NText => Some(NTEXT_LEN),
        TypeId::Xml => Some(MAX_VARLEN_WIDE),
        _ => None,
    }
}

/// Default precision of a temporal type at a given scale.
const fn temporal_precision(base: u8, scale: u8) -> u8 {
    if scale == 0 {
        base
    } else {
        base.saturating_add(1).saturating_add(scale)
    }
}

/// Precision and scale of decimal and scaled temporal columns.
#[must_use]
pub fn precision_scale(type_info: &TypeInfo) -> Option<(i64, i64)> {
    let scale = type_info.scale;
    let precision = match type_info.type_id {
        TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN => {
            type_info.precision
        }
        TypeId::Time if type_info.precision == 0 => temporal_precision(8, scale),
        TypeId::DateTime2 if type_info.precision == 0 => temporal_precision(19, scale),
        TypeId::DateTimeOffset if type_info.precision == 0 => temporal_precision(26, scale),
        TypeId::Time | TypeId::DateTime2 | TypeId::DateTimeOffset => type_info.precision,
        _ => return None,
    };
    Some((i64::from(precision), i64::from(scale)))
}

fn sized(name: &str, size: u32) -> String {
    if size == 0 || size > MAX_INLINE_BYTES {
        format!("{name}(max)")
    } else {
        format!("{name}({size})")
    }
}

/// T-SQL declaration for a parameter of this type, e.g. `nvarchar(4000)`.
pub fn declared_type(type_info: &TypeInfo) -> Result<Cow<'_, str>, TypeError> {
    let size = type_info.size;
    let decl: Cow<'_, str> = match type_info.type_id {
        TypeId::Null => "nvarchar(1)".into(),
        TypeId::Int1 => "tinyint".into(),
        TypeId::Int2 => "smallint".into(),
        TypeId::Int4 => "int".into(),
        TypeId::Int8 => "bigint".into(),
        TypeId::IntN => match size {
            1 => "tinyint".into(),
            2 => "smallint".into(),
            4 => "int".into(),
            8 => "bigint".into(),
            _ => return Err(invalid_size("INTN", size)),
        },
        TypeId::Float4 => "real".into(),
        TypeId::Float8 => "float".into(),
        TypeId::FloatN => match size {
            4 => "real".into(),
            8 => "float".into(),
            _ => return Err(invalid_size("FLOATN", size)),
        },
        TypeId::Bit | TypeId::BitN => "bit".into(),
        TypeId::Decimal | TypeId::DecimalN => {
            format!("decimal({}, {})", type_info.precision, type_info.scale).into()
        }
        TypeId::Numeric | TypeId::NumericN => {
            format!("numeric({}, {})", type_info.precision, type_info.scale).into()
        }
        TypeId::Money => "money".into(),
        TypeId::Money4 => "smallmoney".into(),
        TypeId::MoneyN => match size {
            4 => "smallmoney".into(),
            8 => "money".into(),
            _ => return Err(invalid_size("MONEYN", size)),
        },
        TypeId::DateTime => "datetime".into(),
        TypeId::DateTime4 => "smalldatetime".into(),
        TypeId::DateTimeN => match size {
            4 => "smalldatetime".into(),
            8 => "datetime".into(),
            _ => return Err(invalid_size("DATETIMEN", size)),
        },
        TypeId::Date => "date".into(),
        TypeId::Time => "time".into(),
        TypeId::DateTime2 => format!("datetime2({})", type_info.scale).into(),
        TypeId::DateTimeOffset => format!("datetimeoffset({})", type_info.scale).into(),
        TypeId::Guid => "uniqueidentifier".into(),
        TypeId::Char | TypeId::BigChar => format!("char({size})").into(),
        TypeId::VarChar | TypeId::BigVarChar => sized("varchar", size).into(),
        TypeId::NChar => format!("nchar({})", size / 2).into(),
        TypeId::NVarChar => {
            if size == 0 || size > MAX_INLINE_BYTES {
                "nvarchar(max)".into()
            } else {
                format!("nvarchar({})", size / 2).into()
            }
        }
        TypeId::Binary | TypeId::BigBinary => format!("binary({size})").into(),
        TypeId::VarBinary | TypeId::BigVarBinary => sized("varbinary", size).into(),
        TypeId::Text => "text".into(),
        TypeId::NText => "ntext".into(),
        TypeId::Image => "image".into(),
        TypeId::Xml => "xml".into(),
        TypeId::Variant => "sql_variant".into(),
        TypeId::Udt => match &type_info.udt {
            Some(udt) => Cow::Borrowed(udt.type_name.as_str()),
            None => return Err(TypeError::UnsupportedType(TypeId::Udt as u8)),
        },
    };
    Ok(decl)
}

/// The wire type an outbound parameter value is sent as.
#[must_use]
pub fn param_type_info(value: &SqlValue) -> TypeInfo {
    let var_len = |bytes: usize| {
        if bytes == 0 {
            1
        } else if bytes > MAX_INLINE_BYTES as usize {
            MAX_LENGTH
        } else {
            bytes as u32
        }
    };
    match value {
        SqlValue::Null => TypeInfo::fixed(TypeId::Null),
        SqlValue::Bool(_) => TypeInfo::new(TypeId::BitN, 1),
        SqlValue::TinyInt(_) => TypeInfo::new(TypeId::IntN, 1),
        SqlValue::SmallInt(_) => TypeInfo::new(TypeId::IntN, 2),
        SqlValue::Int(_) => TypeInfo::new(TypeId::IntN, 4),
        SqlValue::BigInt(_) => TypeInfo::new(TypeId::IntN, 8),
        SqlValue::Float(_) => TypeInfo::new(TypeId::FloatN, 4),
        SqlValue::Double(_) => TypeInfo::new(TypeId::FloatN, 8),
        SqlValue::Numeric(n) => TypeInfo::decimal(DEFAULT_PARAM_PRECISION, n.scale()),
        SqlValue::String(s) => {
            let bytes = utf16_byte_len(s);
            let size = if bytes == 0 { 2 } else { var_len(bytes) };
            TypeInfo::new(TypeId::NVarChar, size)
        }
        SqlValue::Binary(b) => TypeInfo::new(TypeId::BigVarBinary, var_len(b.len())),
        SqlValue::Guid(_) => TypeInfo::new(TypeId::Guid, 16),
        SqlValue::Date(_) => TypeInfo::fixed(TypeId::Date),
        SqlValue::Time(_) => TypeInfo::scaled(TypeId::Time, DEFAULT_PARAM_SCALE),
        SqlValue::DateTime(_) => TypeInfo::scaled(TypeId::DateTime2, DEFAULT_PARAM_SCALE),
        SqlValue::DateTimeOffset(_) => {
            TypeInfo::scaled(TypeId::DateTimeOffset, DEFAULT_PARAM_SCALE)
        }
        SqlValue::Xml(_) => TypeInfo::fixed(TypeId::Xml),
    }
}

/// T-SQL declaration for an outbound parameter value.
#[must_use]
pub fn declare_value(value: &SqlValue) -> String {
    let ti = param_type_info(value);
    declared_type(&ti).map_or_else(|_| "sql_variant".to_owned(), Cow::into_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::numeric::Numeric;

    fn ti(type_id: TypeId, size: u32) -> TypeInfo {
        TypeInfo::new(type_id, size)
    }

    fn prec(type_id: TypeId, precision: u8, scale: u8) -> TypeInfo {
        TypeInfo {
            precision,
            scale,
            ..TypeInfo::new(type_id, 0)
        }
    }

    #[test]
    fn test_scan_types() {
        let cases = [
            (TypeId::Int1, ScanType::Int64),
            (TypeId::IntN, ScanType::Int64),
            (TypeId::FloatN, ScanType::Float64),
            (TypeId::Float8, ScanType::Float64),
            (TypeId::BigVarChar, ScanType::String),
            (TypeId::NText, ScanType::String),
            (TypeId::Xml, ScanType::String),
            (TypeId::DateTimeN, ScanType::DateTime),
            (TypeId::DateTimeOffset, ScanType::DateTime),
            (TypeId::Bit, ScanType::Bool),
            (TypeId::BitN, ScanType::Bool),
            (TypeId::DecimalN, ScanType::Bytes),
            (TypeId::MoneyN, ScanType::Bytes),
            (TypeId::Guid, ScanType::Bytes),
            (TypeId::Image, ScanType::Bytes),
            (TypeId::Udt, ScanType::Bytes),
            (TypeId::Variant, ScanType::Unknown),
        ];
        for (type_id, expected) in cases {
            assert_eq!(scan_type(&ti(type_id, 0)), expected, "{type_id:?}");
        }
    }

    #[test]
    fn test_database_type_names() {
        let cases = [
            (ti(TypeId::Int1, 0), "TINYINT"),
            (ti(TypeId::Int2, 0), "SMALLINT"),
            (ti(TypeId::Int4, 0), "INT"),
            (ti(TypeId::Int8, 0), "BIGINT"),
            (ti(TypeId::Float4, 0), "REAL"),
            (ti(TypeId::Float8, 0), "FLOAT"),
            (ti(TypeId::DateTime, 0), "DATETIME"),
            (ti(TypeId::DateTime4, 0), "SMALLDATETIME"),
            (ti(TypeId::BigBinary, 0), "BINARY"),
            (ti(TypeId::IntN, 1), "TINYINT"),
            (ti(TypeId::IntN, 2), "SMALLINT"),
            (ti(TypeId::IntN, 4), "INT"),
            (ti(TypeId::IntN, 8), "BIGINT"),
            (ti(TypeId::FloatN, 4), "REAL"),
            (ti(TypeId::FloatN, 8), "FLOAT"),
            (ti(TypeId::Bit, 0), "BIT"),
            (ti(TypeId::BitN, 0), "BIT"),
            (ti(TypeId::DecimalN, 0), "DECIMAL"),
            (ti(TypeId::NumericN, 0), "DECIMAL"),
            (ti(TypeId::Money, 8), "MONEY"),
            (ti(TypeId::Money4, 4), "SMALLMONEY"),
            (ti(TypeId::MoneyN, 4), "SMALLMONEY"),
            (ti(TypeId::MoneyN, 8), "MONEY"),
            (ti(TypeId::DateTimeN, 4), "SMALLDATETIME"),
            (ti(TypeId::DateTimeN, 8), "DATETIME"),
            (ti(TypeId::DateTime2, 0), "DATETIME2"),
            (ti(TypeId::Date, 0), "DATE"),
            (ti(TypeId::Time, 0), "TIME"),
            (ti(TypeId::DateTimeOffset, 0), "DATETIMEOFFSET"),
            (ti(TypeId::BigVarBinary, 0), "VARBINARY"),
            (ti(TypeId::BigVarChar, 0), "VARCHAR"),
            (ti(TypeId::BigChar, 0), "CHAR"),
            (ti(TypeId::NVarChar, 0), "NVARCHAR"),
            (ti(TypeId::NChar, 0), "NCHAR"),
            (ti(TypeId::VarChar, 0), "VARCHAR"),
            (ti(TypeId::Guid, 0), "UNIQUEIDENTIFIER"),
            (ti(TypeId::Xml, 0), "XML"),
            (ti(TypeId::Text, 0), "TEXT"),
            (ti(TypeId::NText, 0), "NTEXT"),
            (ti(TypeId::Image, 0), "IMAGE"),
            (ti(TypeId::Variant, 0), "SQL_VARIANT"),
        ];
        for (info, expected) in cases {
            assert_eq!(database_type_name(&info).unwrap(), expected, "{:?}", info.type_id);
        }
    }

    #[test]
    fn test_database_type_name_bad_size() {
        assert!(matches!(
            database_type_name(&ti(TypeId::IntN, 3)),
            Err(TypeError::InvalidLength { length: 3, .. })
        ));
    }

    #[test]
    fn test_lengths() {
        let cases = [
            (ti(TypeId::DateTime, 0), None),
            (ti(TypeId::DateTime4, 0), None),
            (ti(TypeId::BigVarChar, MAX_LENGTH), Some(2_147_483_645)),
            (ti(TypeId::BigVarChar, 10), Some(10)),
            (ti(TypeId::BigBinary, 30), Some(30)),
            (ti(TypeId::NVarChar, MAX_LENGTH), Some(1_073_741_822)),
            (ti(TypeId::NVarChar, 20), Some(10)),
            (ti(TypeId::BigVarBinary, MAX_LENGTH), Some(2_147_483_645)),
            (ti(TypeId::BigVarBinary, 50), Some(50)),
            (ti(TypeId::BigChar, 100), Some(100)),
            (ti(TypeId::NChar, 40), Some(20)),
            (ti(TypeId::VarChar, 25), Some(25)),
            (ti(TypeId::Text, 0), Some(2_147_483_647)),
            (ti(TypeId::NText, 0), Some(1_073_741_823)),
            (ti(TypeId::Image, 0), Some(2_147_483_647)),
            (ti(TypeId::Xml, 0), Some(1_073_741_822)),
            (ti(TypeId::Int4, 4), None),
            (ti(TypeId::DecimalN, 9), None),
            (ti(TypeId::Guid, 16), None),
            (ti(TypeId::Variant, 0), None),
        ];
        for (info, expected) in cases {
            assert_eq!(length(&info), expected, "{:?} {}", info.type_id, info.size);
        }
    }

    #[test]
    fn test_precision_scale() {
        let some = [
            (prec(TypeId::DecimalN, 18, 4), (18, 4)),
            (prec(TypeId::NumericN, 38, 10), (38, 10)),
            (prec(TypeId::DateTime2, 27, 7), (27, 7)),
            (prec(TypeId::DateTimeOffset, 34, 5), (34, 5)),
            (prec(TypeId::Time, 16, 3), (16, 3)),
        ];
        for (info, expected) in some {
            assert_eq!(precision_scale(&info), Some(expected), "{:?}", info.type_id);
        }

        for type_id in [
            TypeId::DateTime,
            TypeId::DateTime4,
            TypeId::BigBinary,
            TypeId::MoneyN,
            TypeId::Money,
            TypeId::Money4,
            TypeId::Int4,
            TypeId::Bit,
            TypeId::FloatN,
            TypeId::DateTimeN,
            TypeId::Date,
            TypeId::BigVarBinary,
            TypeId::VarChar,
            TypeId::NVarChar,
            TypeId::Guid,
            TypeId::Xml,
            TypeId::Text,
            TypeId::NText,
            TypeId::Image,
            TypeId::Variant,
            TypeId::Udt,
        ] {
            assert_eq!(precision_scale(&ti(type_id, 8)), None, "{type_id:?}");
        }
    }

    #[test]
    fn test_precision_from_scale_when_absent() {
        assert_eq!(
            precision_scale(&TypeInfo::scaled(TypeId::DateTime2, 7)),
            Some((27, 7))
        );
        assert_eq!(
            precision_scale(&TypeInfo::scaled(TypeId::DateTimeOffset, 7)),
            Some((34, 7))
        );
        assert_eq!(precision_scale(&TypeInfo::scaled(TypeId::Time, 0)), Some((8, 0)));
    }

    #[test]
    fn test_declared_types() {
        let cases = [
            (ti(TypeId::VarChar, MAX_LENGTH), "varchar(max)"),
            (ti(TypeId::VarChar, 8000), "varchar(8000)"),
            (ti(TypeId::VarChar, 4001), "varchar(4001)"),
            (ti(TypeId::NVarChar, MAX_LENGTH), "nvarchar(max)"),
            (ti(TypeId::NVarChar, 8000), "nvarchar(4000)"),
            (ti(TypeId::NVarChar, 4002), "nvarchar(2001)"),
            (ti(TypeId::BigVarBinary, MAX_LENGTH), "varbinary(max)"),
            (ti(TypeId::BigVarBinary, 8000), "varbinary(8000)"),
            (ti(TypeId::BigVarBinary, 4001), "varbinary(4001)"),
            (ti(TypeId::Null, 0), "nvarchar(1)"),
            (ti(TypeId::Int1, 0), "tinyint"),
            (ti(TypeId::Int2, 0), "smallint"),
            (ti(TypeId::Int4, 0), "int"),
            (ti(TypeId::Int8, 0), "bigint"),
            (ti(TypeId::Float4, 0), "real"),
            (ti(TypeId::Float8, 0), "float"),
            (ti(TypeId::Bit, 0), "bit"),
            (ti(TypeId::BitN, 0), "bit"),
            (ti(TypeId::BigBinary, 50), "binary(50)"),
            (ti(TypeId::IntN, 1), "tinyint"),
            (ti(TypeId::IntN, 2), "smallint"),
            (ti(TypeId::IntN, 4), "int"),
            (ti(TypeId::IntN, 8), "bigint"),
            (ti(TypeId::FloatN, 4), "real"),
            (ti(TypeId::FloatN, 8), "float"),
            (prec(TypeId::DecimalN, 18, 4), "decimal(18, 4)"),
            (prec(TypeId::Decimal, 10, 2), "decimal(10, 2)"),
            (prec(TypeId::NumericN, 20, 5), "numeric(20, 5)"),
            (prec(TypeId::Numeric, 15, 3), "numeric(15, 3)"),
            (ti(TypeId::Money4, 0), "smallmoney"),
            (ti(TypeId::Money, 0), "money"),
            (ti(TypeId::MoneyN, 4), "smallmoney"),
            (ti(TypeId::MoneyN, 8), "money"),
            (ti(TypeId::DateTime, 0), "datetime"),
            (ti(TypeId::DateTime4, 0), "smalldatetime"),
            (ti(TypeId::DateTimeN, 4), "smalldatetime"),
            (ti(TypeId::DateTimeN, 8), "datetime"),
            (prec(TypeId::DateTime2, 0, 7), "datetime2(7)"),
            (ti(TypeId::Date, 0), "date"),
            (prec(TypeId::Time, 0, 5), "time"),
            (prec(TypeId::DateTimeOffset, 0, 3), "datetimeoffset(3)"),
            (ti(TypeId::Text, 0), "text"),
            (ti(TypeId::NText, 0), "ntext"),
            (ti(TypeId::BigVarChar, 100), "varchar(100)"),
            (ti(TypeId::BigVarChar, MAX_LENGTH), "varchar(max)"),
            (ti(TypeId::BigChar, 50), "char(50)"),
            (ti(TypeId::NChar, 60), "nchar(30)"),
            (ti(TypeId::Guid, 0), "uniqueidentifier"),
        ];
        for (info, expected) in cases {
            assert_eq!(declared_type(&info).unwrap(), expected, "{:?}", info.type_id);
        }
    }

    #[test]
    fn test_declare_value() {
        assert_eq!(declare_value(&SqlValue::Null), "nvarchar(1)");
        assert_eq!(declare_value(&SqlValue::Int(1)), "int");
        assert_eq!(declare_value(&SqlValue::Bool(true)), "bit");
        assert_eq!(declare_value(&SqlValue::Double(1.0)), "float");
        assert_eq!(declare_value(&SqlValue::from("abc")), "nvarchar(3)");
        assert_eq!(declare_value(&SqlValue::from("")), "nvarchar(1)");
        assert_eq!(declare_value(&SqlValue::from("x".repeat(4001))), "nvarchar(max)");
        assert_eq!(declare_value(&SqlValue::from(vec![0u8; 10])), "varbinary(10)");
        assert_eq!(
            declare_value(&SqlValue::Numeric(Numeric::new(12345, 2).unwrap())),
            "decimal(38, 2)"
        );
        assert_eq!(
            declare_value(&SqlValue::DateTime(chrono::NaiveDateTime::default())),
            "datetime2(7)"
        );
        assert_eq!(declare_value(&SqlValue::Xml(String::new())), "xml");
    }
}
