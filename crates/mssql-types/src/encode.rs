//! TDS binary encoding for SQL values.
//!
//! [`encode`] produces the bytes of one non-NULL value under a target
//! `TypeInfo`. [`encode_value`] adds the row-data length prefix, so its output
//! reads back with [`crate::decode::decode_value`].

use bytes::{BufMut, BytesMut};
use chrono::NaiveTime;
use tds_protocol::{Charset, Collation, TypeId, TypeInfo, codec::utf16le_bytes, metadata::MAX_LENGTH};

use crate::decode::PLP_NULL;
use crate::error::TypeError;
use crate::guid::encode_guid;
use crate::numeric::{Numeric, encode_decimal, encode_money, encode_small_money};
use crate::temporal;
use crate::value::SqlValue;

/// Length of the dummy text pointer written for `TEXT`/`NTEXT`/`IMAGE`.
const TEXT_PTR_LEN: u8 = 16;

fn mismatch(value: &SqlValue, to: &'static str) -> TypeError {
    TypeError::UnsupportedConversion {
        from: value.type_name().to_owned(),
        to,
    }
}

fn integer(value: &SqlValue, to: &'static str) -> Result<i64, TypeError> {
    match value {
        SqlValue::Bool(b) => Ok(i64::from(*b)),
        other => other.as_i64().ok_or_else(|| mismatch(other, to)),
    }
}

fn narrow_int<T: TryFrom<i64>>(value: &SqlValue, to: &'static str) -> Result<T, TypeError> {
    T::try_from(integer(value, to)?).map_err(|_| TypeError::OutOfRange { target_type: to })
}

fn float(value: &SqlValue, to: &'static str) -> Result<f64, TypeError> {
    match value {
        SqlValue::Numeric(n) => Ok(n.to_f64()),
        other => other
            .as_f64()
            .or_else(|| other.as_i64().map(|v| v as f64))
            .ok_or_else(|| mismatch(other, to)),
    }
}

fn numeric(value: &SqlValue, to: &'static str) -> Result<Numeric, TypeError> {
    match value {
        SqlValue::Numeric(n) => Ok(*n),
        other => other
            .as_i64()
            .map(Numeric::from)
            .ok_or_else(|| mismatch(other, to)),
    }
}

fn datetime(value: &SqlValue, to: &'static str) -> Result<chrono::NaiveDateTime, TypeError> {
    match value {
        SqlValue::DateTime(dt) => Ok(*dt),
        SqlValue::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
        other => Err(mismatch(other, to)),
    }
}

fn text<'a>(value: &'a SqlValue, to: &'static str) -> Result<&'a str, TypeError> {
    value.as_str().ok_or_else(|| mismatch(value, to))
}

/// Encode text for a narrow column with the collation's charset.
#[must_use]
pub fn encode_narrow(s: &str, collation: Option<&Collation>) -> Vec<u8> {
    collation
        .map_or(Charset::Passthrough, Collation::charset)
        .encode(s)
}

/// Encode the bytes of one non-NULL value under `type_info`.
///
/// `*N` types take their width from `type_info.size`.
pub fn encode(type_info: &TypeInfo, value: &SqlValue, guid_conversion: bool) -> Result<Vec<u8>, TypeError> {
    if value.is_null() {
        return Err(TypeError::UnexpectedNull);
    }
    let bytes = match type_info.type_id {
        TypeId::Null => Vec::new(),
        TypeId::Int1 => vec![narrow_int::<u8>(value, "TINYINT")?],
        TypeId::Int2 => narrow_int::<i16>(value, "SMALLINT")?.to_le_bytes().to_vec(),
        TypeId::Int4 => narrow_int::<i32>(value, "INT")?.to_le_bytes().to_vec(),
        TypeId::Int8 => integer(value, "BIGINT")?.to_le_bytes().to_vec(),
        TypeId::IntN => match type_info.size {
            1 => vec![narrow_int::<u8>(value, "TINYINT")?],
            2 => narrow_int::<i16>(value, "SMALLINT")?.to_le_bytes().to_vec(),
            4 => narrow_int::<i32>(value, "INT")?.to_le_bytes().to_vec(),
            8 => integer(value, "BIGINT")?.to_le_bytes().to_vec(),
            size => {
                return Err(TypeError::InvalidLength {
                    type_name: "INTN",
                    length: size as usize,
                });
            }
        },
        TypeId::Bit | TypeId::BitN => match value {
            SqlValue::Bool(b) => vec![u8::from(*b)],
            other => vec![u8::from(integer(other, "BIT")? != 0)],
        },
        TypeId::Float4 => (float(value, "REAL")? as f32).to_le_bytes().to_vec(),
        TypeId::Float8 => float(value, "FLOAT")?.to_le_bytes().to_vec(),
        TypeId::FloatN => match type_info.size {
            4 => (float(value, "REAL")? as f32).to_le_bytes().to_vec(),
            8 => float(value, "FLOAT")?.to_le_bytes().to_vec(),
            size => {
                return Err(TypeError::InvalidLength {
                    type_name: "FLOATN",
                    length: size as usize,
                });
            }
        },
        TypeId::Money => encode_money(&numeric(value, "MONEY")?)?.to_vec(),
        TypeId::Money4 => encode_small_money(&numeric(value, "SMALLMONEY")?)?.to_vec(),
        TypeId::MoneyN => match type_info.size {
            4 => encode_small_money(&numeric(value, "SMALLMONEY")?)?.to_vec(),
            8 => encode_money(&numeric(value, "MONEY")?)?.to_vec(),
            size => {
                return Err(TypeError::InvalidLength {
                    type_name: "MONEYN",
                    length: size as usize,
                });
            }
        },
        TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN => encode_decimal(
            &numeric(value, "DECIMAL")?,
            type_info.precision,
            type_info.scale,
        )?,
        TypeId::DateTime => temporal::encode_datetime(datetime(value, "DATETIME")?).to_vec(),
        TypeId::DateTime4 => {
            temporal::encode_small_datetime(datetime(value, "SMALLDATETIME")?).to_vec()
        }
        TypeId::DateTimeN => match type_info.size {
            4 => temporal::encode_small_datetime(datetime(value, "SMALLDATETIME")?).to_vec(),
            8 => temporal::encode_datetime(datetime(value, "DATETIME")?).to_vec(),
            size => {
                return Err(TypeError::InvalidLength {
                    type_name: "DATETIMEN",
                    length: size as usize,
                });
            }
        },
        TypeId::Date => temporal::encode_date(datetime(value, "DATE")?.date()).to_vec(),
        TypeId::Time => match value {
            SqlValue::Time(t) => temporal::encode_time(*t, type_info.scale)?,
            SqlValue::DateTime(dt) => temporal::encode_time(dt.time(), type_info.scale)?,
            other => return Err(mismatch(other, "TIME")),
        },
        TypeId::DateTime2 => {
            temporal::encode_datetime2(datetime(value, "DATETIME2")?, type_info.scale)?
        }
        TypeId::DateTimeOffset => match value {
            SqlValue::DateTimeOffset(dt) => temporal::encode_datetimeoffset(*dt, type_info.scale)?,
            other => return Err(mismatch(other, "DATETIMEOFFSET")),
        },
        TypeId::Guid => match value {
            SqlValue::Guid(g) => encode_guid(g, guid_conversion).to_vec(),
            other => return Err(mismatch(other, "UNIQUEIDENTIFIER")),
        },
        TypeId::Char | TypeId::VarChar | TypeId::BigChar | TypeId::BigVarChar | TypeId::Text => {
            encode_narrow(text(value, "VARCHAR")?, type_info.collation.as_ref())
        }
        TypeId::NChar | TypeId::NVarChar | TypeId::NText => {
            utf16le_bytes(text(value, "NVARCHAR")?)
        }
        TypeId::Xml => utf16le_bytes(text(value, "XML")?),
        TypeId::Binary
        | TypeId::VarBinary
        | TypeId::BigBinary
        | TypeId::BigVarBinary
        | TypeId::Image
        | TypeId::Udt => match value {
            SqlValue::Binary(b) => b.to_vec(),
            other => return Err(mismatch(other, "VARBINARY")),
        },
        TypeId::Variant => return Err(mismatch(value, "SQL_VARIANT")),
    };
    Ok(bytes)
}

/// Write a PLP value as one chunk followed by the terminator.
pub fn write_plp(dst: &mut BytesMut, body: Option<&[u8]>) {
    match body {
        None => dst.put_u64_le(PLP_NULL),
        Some(body) => {
            dst.put_u64_le(body.len() as u64);
            if !body.is_empty() {
                dst.put_u32_le(body.len() as u32);
                dst.put_slice(body);
            }
            dst.put_u32_le(0);
        }
    }
}

/// Write one value with the row-data length prefix its type uses.
pub fn encode_value(
    dst: &mut BytesMut,
    type_info: &TypeInfo,
    value: &SqlValue,
    guid_conversion: bool,
) -> Result<(), TypeError> {
    let type_id = type_info.type_id;
    let body = if value.is_null() {
        None
    } else {
        Some(encode(type_info, value, guid_conversion)?)
    };

    if type_id == TypeId::Null {
        return Ok(());
    }
    if type_id.is_fixed_length() {
        let body = body.ok_or(TypeError::UnexpectedNull)?;
        dst.put_slice(&body);
        return Ok(());
    }
    if type_id.is_byte_len() {
        match body {
            None => dst.put_u8(0),
            Some(body) => {
                let len = u8::try_from(body.len()).map_err(|_| TypeError::InvalidLength {
                    type_name: "BYTELEN",
                    length: body.len(),
                })?;
                dst.put_u8(len);
                dst.put_slice(&body);
            }
        }
        return Ok(());
    }
    if type_info.is_plp() {
        write_plp(dst, body.as_deref());
        return Ok(());
    }
    if type_id.is_ushort_len() || type_id == TypeId::Udt {
        match body {
            None => dst.put_u16_le(MAX_LENGTH as u16),
            Some(body) => {
                let len = u16::try_from(body.len())
                    .ok()
                    .filter(|&l| u32::from(l) < MAX_LENGTH)
                    .ok_or(TypeError::InvalidLength {
                        type_name: "USHORTLEN",
                        length: body.len(),
                    })?;
                dst.put_u16_le(len);
                dst.put_slice(&body);
            }
        }
        return Ok(());
    }
    if type_id.is_text_ptr() {
        match body {
            None => dst.put_u8(0),
            Some(body) => {
                dst.put_u8(TEXT_PTR_LEN);
                dst.put_bytes(0, usize::from(TEXT_PTR_LEN) + 8);
                dst.put_u32_le(body.len() as u32);
                dst.put_slice(&body);
            }
        }
        return Ok(());
    }
    Err(TypeError::UnsupportedType(type_id as u8))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::decode::{decode, decode_value};
    use bytes::Bytes;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn test_encode_ints() {
        let int4 = TypeInfo::fixed(TypeId::Int4);
        assert_eq!(encode(&int4, &SqlValue::Int(42), false).unwrap(), [42, 0, 0, 0]);
        assert_eq!(
            encode(&int4, &SqlValue::TinyInt(1), false).unwrap(),
            [1, 0, 0, 0]
        );
        assert!(matches!(
            encode(&int4, &SqlValue::BigInt(i64::MAX), false),
            Err(TypeError::OutOfRange { .. })
        ));
        let intn = TypeInfo::new(TypeId::IntN, 2);
        assert_eq!(encode(&intn, &SqlValue::Int(-2), false).unwrap(), [0xFE, 0xFF]);
    }

    #[test]
    fn test_encode_null_rejected_by_pure_encode() {
        assert_eq!(
            encode(&TypeInfo::fixed(TypeId::Int4), &SqlValue::Null, false),
            Err(TypeError::UnexpectedNull)
        );
    }

    #[test]
    fn test_encode_mismatch() {
        let err = encode(&TypeInfo::fixed(TypeId::Guid), &SqlValue::Int(1), false).unwrap_err();
        assert!(matches!(err, TypeError::UnsupportedConversion { to: "UNIQUEIDENTIFIER", .. }));
    }

    #[test]
    fn test_encode_money_matches_wire_layout() {
        let n: Numeric = "1.0000".parse().unwrap();
        assert_eq!(
            encode(&TypeInfo::fixed(TypeId::Money), &SqlValue::Numeric(n), false).unwrap(),
            [0, 0, 0, 0, 0x10, 0x27, 0, 0]
        );
    }

    #[test]
    fn test_encode_strings() {
        let nvarchar = TypeInfo::new(TypeId::NVarChar, 20);
        assert_eq!(
            encode(&nvarchar, &SqlValue::from("AB"), false).unwrap(),
            [0x41, 0, 0x42, 0]
        );
        let varchar = TypeInfo::new(TypeId::BigVarChar, 20).with_collation(Collation::new(0x0409, 52));
        assert_eq!(
            encode(&varchar, &SqlValue::from("café"), false).unwrap(),
            [b'c', b'a', b'f', 0xE9]
        );
    }

    #[test]
    fn test_encode_value_prefixes() {
        let mut dst = BytesMut::new();
        encode_value(&mut dst, &TypeInfo::new(TypeId::IntN, 4), &SqlValue::Null, false).unwrap();
        encode_value(&mut dst, &TypeInfo::new(TypeId::IntN, 4), &SqlValue::Int(1), false).unwrap();
        encode_value(&mut dst, &TypeInfo::new(TypeId::NVarChar, 10), &SqlValue::Null, false).unwrap();
        assert_eq!(&dst[..], &[0, 4, 1, 0, 0, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_fixed_type_null_is_error() {
        let mut dst = BytesMut::new();
        assert_eq!(
            encode_value(&mut dst, &TypeInfo::fixed(TypeId::Int4), &SqlValue::Null, false),
            Err(TypeError::UnexpectedNull)
        );
    }

    #[test]
    fn test_value_roundtrips() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_nano_opt(8, 15, 0, 123_456_700)
            .unwrap();
        let cases = vec![
            (TypeInfo::new(TypeId::BitN, 1), SqlValue::Bool(true)),
            (TypeInfo::new(TypeId::FloatN, 8), SqlValue::Double(-0.5)),
            (TypeInfo::decimal(18, 4), SqlValue::Numeric("-12.3400".parse().unwrap())),
            (TypeInfo::scaled(TypeId::DateTime2, 7), SqlValue::DateTime(dt)),
            (TypeInfo::fixed(TypeId::Date), SqlValue::Date(dt.date())),
            (TypeInfo::new(TypeId::Guid, 16), SqlValue::Guid(Uuid::from_u128(0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10))),
            (TypeInfo::new(TypeId::NVarChar, MAX_LENGTH), SqlValue::from("日本語")),
            (TypeInfo::new(TypeId::BigVarBinary, 100), SqlValue::Binary(Bytes::from_static(b"\x00\x01"))),
            (TypeInfo::new(TypeId::NText, 0x7FFF_FFFF), SqlValue::from("legacy")),
            (TypeInfo::fixed(TypeId::Xml), SqlValue::Xml("<a/>".into())),
        ];
        for (ti, value) in cases {
            for conversion in [true, false] {
                let mut dst = BytesMut::new();
                encode_value(&mut dst, &ti, &value, conversion).unwrap();
                let mut src = dst.freeze();
                let back = decode_value(&mut src, &ti, conversion).unwrap();
                assert_eq!(back, value, "{:?}", ti.type_id);
                assert!(src.is_empty());
            }
        }
    }

    #[test]
    fn test_small_datetime_from_date() {
        let ti = TypeInfo::new(TypeId::DateTimeN, 4);
        let d = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let raw = encode(&ti, &SqlValue::Date(d), false).unwrap();
        assert_eq!(raw, [0xAC, 0x8E, 0, 0]);
        assert_eq!(
            decode(&ti, &raw, false).unwrap(),
            SqlValue::DateTime(d.and_time(NaiveTime::MIN))
        );
    }
}
