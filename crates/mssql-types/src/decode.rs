//! TDS binary decoding for SQL values.
//!
//! [`decode`] converts the bytes of one non-NULL value into a [`SqlValue`].
//! [`decode_value`] first consumes the row-data length prefix the column's
//! type uses (byte, ushort, PLP chunks, text pointer or `sql_variant`).

use bytes::{Buf, Bytes, BytesMut};
use tds_protocol::{Charset, Collation, TypeId, TypeInfo, metadata::MAX_LENGTH};

use crate::error::TypeError;
use crate::guid::decode_guid;
use crate::numeric::{decode_decimal, decode_money, decode_small_money};
use crate::temporal;
use crate::value::SqlValue;

/// PLP total length marking a NULL value.
pub const PLP_NULL: u64 = u64::MAX;

/// PLP total length when the sender does not know the size up front.
pub const PLP_UNKNOWN_LEN: u64 = u64::MAX - 1;

/// Length of the timestamp following a text pointer.
const TEXT_TIMESTAMP_LEN: usize = 8;

fn fixed<const N: usize>(raw: &[u8], type_name: &'static str) -> Result<[u8; N], TypeError> {
    raw.try_into().map_err(|_| {
        if raw.len() < N {
            TypeError::short(N, raw.len())
        } else {
            TypeError::InvalidLength {
                type_name,
                length: raw.len(),
            }
        }
    })
}

/// Decode UCS-2/UTF-16LE text. Unpaired surrogates become U+FFFD.
pub fn decode_ucs2(raw: &[u8]) -> Result<String, TypeError> {
    if raw.len() % 2 != 0 {
        return Err(TypeError::InvalidEncoding(format!(
            "odd UTF-16 byte length {}",
            raw.len()
        )));
    }
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    Ok(String::from_utf16_lossy(&units))
}

/// Decode narrow character data with the collation's charset.
#[must_use]
pub fn decode_narrow(raw: &[u8], collation: Option<&Collation>) -> String {
    collation
        .map_or(Charset::Passthrough, Collation::charset)
        .decode(raw)
}

/// Decode the bytes of one non-NULL value.
///
/// `raw` excludes any length prefix. `*N` types pick their width from
/// `raw.len()`. GUIDs are converted from the wire byte order when
/// `guid_conversion` is set.
pub fn decode(type_info: &TypeInfo, raw: &[u8], guid_conversion: bool) -> Result<SqlValue, TypeError> {
    let value = match type_info.type_id {
        TypeId::Null => SqlValue::Null,
        TypeId::Int1 => SqlValue::TinyInt(fixed::<1>(raw, "TINYINT")?[0]),
        TypeId::Bit | TypeId::BitN => SqlValue::Bool(fixed::<1>(raw, "BIT")?[0] != 0),
        TypeId::Int2 => SqlValue::SmallInt(i16::from_le_bytes(fixed(raw, "SMALLINT")?)),
        TypeId::Int4 => SqlValue::Int(i32::from_le_bytes(fixed(raw, "INT")?)),
        TypeId::Int8 => SqlValue::BigInt(i64::from_le_bytes(fixed(raw, "BIGINT")?)),
        TypeId::IntN => match raw.len() {
            1 => SqlValue::TinyInt(raw[0]),
            2 => SqlValue::SmallInt(i16::from_le_bytes(fixed(raw, "SMALLINT")?)),
            4 => SqlValue::Int(i32::from_le_bytes(fixed(raw, "INT")?)),
            8 => SqlValue::BigInt(i64::from_le_bytes(fixed(raw, "BIGINT")?)),
            length => {
                return Err(TypeError::InvalidLength {
                    type_name: "INTN",
                    length,
                });
            }
        },
        TypeId::Float4 => SqlValue::Float(f32::from_le_bytes(fixed(raw, "REAL")?)),
        TypeId::Float8 => SqlValue::Double(f64::from_le_bytes(fixed(raw, "FLOAT")?)),
        TypeId::FloatN => match raw.len() {
            4 => SqlValue::Float(f32::from_le_bytes(fixed(raw, "REAL")?)),
            8 => SqlValue::Double(f64::from_le_bytes(fixed(raw, "FLOAT")?)),
            length => {
                return Err(TypeError::InvalidLength {
                    type_name: "FLOATN",
                    length,
                });
            }
        },
        TypeId::Money => SqlValue::Numeric(decode_money(raw)?),
        TypeId::Money4 => SqlValue::Numeric(decode_small_money(raw)?),
        TypeId::MoneyN => match raw.len() {
            4 => SqlValue::Numeric(decode_small_money(raw)?),
            8 => SqlValue::Numeric(decode_money(raw)?),
            length => {
                return Err(TypeError::InvalidLength {
                    type_name: "MONEYN",
                    length,
                });
            }
        },
        TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN => {
            SqlValue::Numeric(decode_decimal(raw, type_info.scale)?)
        }
        TypeId::DateTime => SqlValue::DateTime(temporal::decode_datetime(raw)?),
        TypeId::DateTime4 => SqlValue::DateTime(temporal::decode_small_datetime(raw)?),
        TypeId::DateTimeN => match raw.len() {
            4 => SqlValue::DateTime(temporal::decode_small_datetime(raw)?),
            8 => SqlValue::DateTime(temporal::decode_datetime(raw)?),
            length => {
                return Err(TypeError::InvalidLength {
                    type_name: "DATETIMEN",
                    length,
                });
            }
        },
        TypeId::Date => SqlValue::Date(temporal::decode_date(raw)?),
        TypeId::Time => SqlValue::Time(temporal::decode_time(type_info.scale, raw)?),
        TypeId::DateTime2 => {
            SqlValue::DateTime(temporal::decode_datetime2(type_info.scale, raw)?)
        }
        TypeId::DateTimeOffset => {
            SqlValue::DateTimeOffset(temporal::decode_datetimeoffset(type_info.scale, raw)?)
        }
        TypeId::Guid => SqlValue::Guid(decode_guid(raw, guid_conversion)?),
        TypeId::Char | TypeId::VarChar | TypeId::BigChar | TypeId::BigVarChar | TypeId::Text => {
            SqlValue::String(decode_narrow(raw, type_info.collation.as_ref()))
        }
        TypeId::NChar | TypeId::NVarChar | TypeId::NText => SqlValue::String(decode_ucs2(raw)?),
        TypeId::Xml => SqlValue::Xml(decode_ucs2(raw)?),
        TypeId::Binary
        | TypeId::VarBinary
        | TypeId::BigBinary
        | TypeId::BigVarBinary
        | TypeId::Image
        | TypeId::Udt => SqlValue::Binary(Bytes::copy_from_slice(raw)),
        TypeId::Variant => decode_variant(raw, guid_conversion)?,
    };
    Ok(value)
}

/// Decode a `sql_variant` body: base type, property count, properties, data.
fn decode_variant(raw: &[u8], guid_conversion: bool) -> Result<SqlValue, TypeError> {
    let mut src = raw;
    if src.remaining() < 2 {
        return Err(TypeError::short(2, src.remaining()));
    }
    let base = src.get_u8();
    let prop_len = usize::from(src.get_u8());
    let type_id = TypeId::from_u8(base).ok_or(TypeError::UnsupportedType(base))?;
    if src.remaining() < prop_len {
        return Err(TypeError::short(prop_len, src.remaining()));
    }
    let (mut props, data) = src.split_at(prop_len);

    let mut info = TypeInfo::new(type_id, data.len() as u32);
    match type_id {
        TypeId::DecimalN | TypeId::NumericN => {
            if props.remaining() < 2 {
                return Err(TypeError::short(2, props.remaining()));
            }
            info.precision = props.get_u8();
            info.scale = props.get_u8();
        }
        TypeId::Time | TypeId::DateTime2 | TypeId::DateTimeOffset => {
            if props.remaining() < 1 {
                return Err(TypeError::short(1, 0));
            }
            info.scale = props.get_u8();
        }
        TypeId::BigVarChar | TypeId::BigChar | TypeId::NVarChar | TypeId::NChar => {
            info.collation = Some(Collation::decode(&mut props)?);
        }
        TypeId::Variant | TypeId::Xml | TypeId::Udt | TypeId::Text | TypeId::NText | TypeId::Image => {
            return Err(TypeError::UnsupportedType(base));
        }
        _ => {}
    }
    decode(&info, data, guid_conversion)
}

fn take(src: &mut Bytes, len: usize) -> Result<Bytes, TypeError> {
    if src.remaining() < len {
        return Err(TypeError::short(len, src.remaining()));
    }
    Ok(src.split_to(len))
}

/// Read a partially length-prefixed value; `None` is NULL.
pub fn read_plp(src: &mut Bytes) -> Result<Option<Bytes>, TypeError> {
    if src.remaining() < 8 {
        return Err(TypeError::short(8, src.remaining()));
    }
    let total = src.get_u64_le();
    if total == PLP_NULL {
        return Ok(None);
    }
    let mut out = if total == PLP_UNKNOWN_LEN {
        BytesMut::new()
    } else {
        BytesMut::with_capacity(usize::try_from(total).unwrap_or(0).min(src.remaining()))
    };
    loop {
        if src.remaining() < 4 {
            return Err(TypeError::short(4, src.remaining()));
        }
        let chunk = src.get_u32_le() as usize;
        if chunk == 0 {
            break;
        }
        out.extend_from_slice(&take(src, chunk)?);
    }
    if total != PLP_UNKNOWN_LEN && out.len() as u64 != total {
        return Err(TypeError::InvalidLength {
            type_name: "PLP",
            length: out.len(),
        });
    }
    Ok(Some(out.freeze()))
}

/// Read the length prefix and body of one value; `None` is NULL.
pub fn read_value_bytes(src: &mut Bytes, type_info: &TypeInfo) -> Result<Option<Bytes>, TypeError> {
    let type_id = type_info.type_id;
    if type_id == TypeId::Null {
        return Ok(None);
    }
    if let Some(size) = type_id.fixed_size().filter(|_| type_id.is_fixed_length()) {
        return take(src, size).map(Some);
    }
    if type_id.is_byte_len() {
        if src.remaining() < 1 {
            return Err(TypeError::short(1, 0));
        }
        let len = usize::from(src.get_u8());
        return if len == 0 { Ok(None) } else { take(src, len).map(Some) };
    }
    if type_info.is_plp() {
        return read_plp(src);
    }
    if type_id.is_ushort_len() || type_id == TypeId::Udt {
        if src.remaining() < 2 {
            return Err(TypeError::short(2, src.remaining()));
        }
        let len = src.get_u16_le();
        return if u32::from(len) == MAX_LENGTH {
            Ok(None)
        } else {
            take(src, usize::from(len)).map(Some)
        };
    }
    if type_id.is_text_ptr() {
        if src.remaining() < 1 {
            return Err(TypeError::short(1, 0));
        }
        let ptr_len = usize::from(src.get_u8());
        if ptr_len == 0 {
            return Ok(None);
        }
        take(src, ptr_len + TEXT_TIMESTAMP_LEN)?;
        if src.remaining() < 4 {
            return Err(TypeError::short(4, src.remaining()));
        }
        let len = src.get_u32_le() as usize;
        return take(src, len).map(Some);
    }
    if type_id == TypeId::Variant {
        if src.remaining() < 4 {
            return Err(TypeError::short(4, src.remaining()));
        }
        let len = src.get_u32_le() as usize;
        return if len == 0 { Ok(None) } else { take(src, len).map(Some) };
    }
    Err(TypeError::UnsupportedType(type_id as u8))
}

/// Decode one value from row data, length prefix included.
pub fn decode_value(
    src: &mut Bytes,
    type_info: &TypeInfo,
    guid_conversion: bool,
) -> Result<SqlValue, TypeError> {
    match read_value_bytes(src, type_info)? {
        Some(raw) => decode(type_info, &raw, guid_conversion),
        None => Ok(SqlValue::Null),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::numeric::Numeric;

    fn info(type_id: TypeId) -> TypeInfo {
        TypeInfo::fixed(type_id)
    }

    #[test]
    fn test_decode_fixed_ints() {
        assert_eq!(decode(&info(TypeId::Int1), &[0xFF], false).unwrap(), SqlValue::TinyInt(255));
        assert_eq!(
            decode(&info(TypeId::Int2), &[0xFE, 0xFF], false).unwrap(),
            SqlValue::SmallInt(-2)
        );
        assert_eq!(
            decode(&info(TypeId::Int4), &[42, 0, 0, 0], false).unwrap(),
            SqlValue::Int(42)
        );
        assert_eq!(
            decode(&info(TypeId::Int8), &(-1i64).to_le_bytes(), false).unwrap(),
            SqlValue::BigInt(-1)
        );
    }

    #[test]
    fn test_decode_intn_by_width() {
        let intn = TypeInfo::new(TypeId::IntN, 8);
        assert_eq!(decode(&intn, &[7], false).unwrap(), SqlValue::TinyInt(7));
        assert_eq!(decode(&intn, &[1, 1], false).unwrap(), SqlValue::SmallInt(257));
        assert_eq!(decode(&intn, &[1, 0, 0, 0], false).unwrap(), SqlValue::Int(1));
        assert_eq!(
            decode(&intn, &5i64.to_le_bytes(), false).unwrap(),
            SqlValue::BigInt(5)
        );
        assert!(matches!(
            decode(&intn, &[1, 2, 3], false),
            Err(TypeError::InvalidLength { length: 3, .. })
        ));
    }

    #[test]
    fn test_decode_floats() {
        let fltn = TypeInfo::new(TypeId::FloatN, 8);
        assert_eq!(
            decode(&fltn, &1.5f32.to_le_bytes(), false).unwrap(),
            SqlValue::Float(1.5)
        );
        assert_eq!(
            decode(&fltn, &2.25f64.to_le_bytes(), false).unwrap(),
            SqlValue::Double(2.25)
        );
        assert!(decode(&info(TypeId::Float8), &[0; 4], false).is_err());
    }

    #[test]
    fn test_short_input_is_buffer_too_small() {
        assert!(matches!(
            decode(&info(TypeId::Int4), &[1, 2], false),
            Err(TypeError::BufferTooSmall { needed: 4, available: 2 })
        ));
        assert!(matches!(
            decode(&info(TypeId::Money), &[0; 3], false),
            Err(TypeError::BufferTooSmall { needed: 8, available: 3 })
        ));
    }

    #[test]
    fn test_decode_money_halves() {
        let raw = [0, 0, 0, 0, 0x10, 0x27, 0, 0];
        let value = decode(&info(TypeId::Money), &raw, false).unwrap();
        assert_eq!(value.as_numeric().unwrap().to_string(), "1.0000");

        let moneyn = TypeInfo::new(TypeId::MoneyN, 4);
        let value = decode(&moneyn, &10_000i32.to_le_bytes(), false).unwrap();
        assert_eq!(value.as_numeric().unwrap().to_string(), "1.0000");
    }

    #[test]
    fn test_decode_decimal_uses_scale() {
        let ti = TypeInfo::decimal(10, 2);
        let value = decode(&ti, &[1, 0x39, 0x30, 0, 0], false).unwrap();
        assert_eq!(value, SqlValue::Numeric(Numeric::new(12345, 2).unwrap()));
        assert_eq!(value.as_numeric().unwrap().to_string(), "123.45");
    }

    #[test]
    fn test_decode_ucs2() {
        assert_eq!(decode_ucs2(&[0x3A, 0x26]).unwrap(), "☺");
        assert_eq!(
            decode_ucs2(&[b'h', 0, b'e', 0, b'l', 0, b'l', 0, b'o', 0]).unwrap(),
            "hello"
        );
        assert_eq!(decode_ucs2(&[]).unwrap(), "");
        assert!(decode_ucs2(&[0x41]).is_err());
        assert_eq!(decode_ucs2(&[0x00, 0xD8]).unwrap(), "\u{FFFD}");
    }

    #[test]
    fn test_decode_xml_and_udt() {
        let raw = [b'<', 0, b'a', 0, b'/', 0, b'>', 0];
        assert_eq!(
            decode(&info(TypeId::Xml), &raw, false).unwrap(),
            SqlValue::Xml("<a/>".into())
        );
        assert_eq!(
            decode(&TypeInfo::new(TypeId::Udt, 10), &[1, 2, 3], false).unwrap(),
            SqlValue::Binary(Bytes::from_static(&[1, 2, 3]))
        );
    }

    #[test]
    fn test_decode_narrow_uses_collation() {
        let latin1 = TypeInfo::new(TypeId::BigVarChar, 10).with_collation(Collation::new(0x0409, 52));
        assert_eq!(
            decode(&latin1, &[b'c', b'a', b'f', 0xE9], false).unwrap(),
            SqlValue::String("café".into())
        );
        let bare = TypeInfo::new(TypeId::BigVarChar, 10);
        assert_eq!(
            decode(&bare, b"plain", false).unwrap(),
            SqlValue::String("plain".into())
        );
    }

    #[test]
    fn test_decode_value_byte_len_null() {
        let ti = TypeInfo::new(TypeId::IntN, 4);
        let mut src = Bytes::from_static(&[0, 4, 42, 0, 0, 0]);
        assert_eq!(decode_value(&mut src, &ti, false).unwrap(), SqlValue::Null);
        assert_eq!(decode_value(&mut src, &ti, false).unwrap(), SqlValue::Int(42));
        assert!(src.is_empty());
    }

    #[test]
    fn test_decode_value_ushort() {
        let ti = TypeInfo::new(TypeId::NVarChar, 100);
        let mut src = Bytes::from_static(&[4, 0, 0x41, 0x00, 0x42, 0x00, 0xFF, 0xFF]);
        assert_eq!(
            decode_value(&mut src, &ti, false).unwrap(),
            SqlValue::String("AB".into())
        );
        assert_eq!(decode_value(&mut src, &ti, false).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_decode_value_plp() {
        let ti = TypeInfo::new(TypeId::BigVarBinary, MAX_LENGTH);
        let mut raw = 5u64.to_le_bytes().to_vec();
        raw.extend_from_slice(&3u32.to_le_bytes());
        raw.extend_from_slice(&[1, 2, 3]);
        raw.extend_from_slice(&2u32.to_le_bytes());
        raw.extend_from_slice(&[4, 5]);
        raw.extend_from_slice(&0u32.to_le_bytes());
        raw.extend_from_slice(&PLP_NULL.to_le_bytes());
        let mut src = Bytes::from(raw);
        assert_eq!(
            decode_value(&mut src, &ti, false).unwrap(),
            SqlValue::Binary(Bytes::from_static(&[1, 2, 3, 4, 5]))
        );
        assert_eq!(decode_value(&mut src, &ti, false).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_plp_length_mismatch() {
        let mut raw = 9u64.to_le_bytes().to_vec();
        raw.extend_from_slice(&1u32.to_le_bytes());
        raw.push(7);
        raw.extend_from_slice(&0u32.to_le_bytes());
        assert!(read_plp(&mut Bytes::from(raw)).is_err());
    }

    #[test]
    fn test_decode_value_text_ptr() {
        let ti = TypeInfo::new(TypeId::Image, 0x7FFF_FFFF);
        let mut raw = vec![16];
        raw.extend_from_slice(&[0xAA; 16]);
        raw.extend_from_slice(&[0xBB; 8]);
        raw.extend_from_slice(&2u32.to_le_bytes());
        raw.extend_from_slice(&[9, 8]);
        raw.push(0);
        let mut src = Bytes::from(raw);
        assert_eq!(
            decode_value(&mut src, &ti, false).unwrap(),
            SqlValue::Binary(Bytes::from_static(&[9, 8]))
        );
        assert_eq!(decode_value(&mut src, &ti, false).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_decode_value_variant() {
        let ti = TypeInfo::new(TypeId::Variant, 8016);
        let mut raw = 6u32.to_le_bytes().to_vec();
        raw.extend_from_slice(&[TypeId::Int4 as u8, 0, 7, 0, 0, 0]);
        raw.extend_from_slice(&0u32.to_le_bytes());
        let mut src = Bytes::from(raw);
        assert_eq!(decode_value(&mut src, &ti, false).unwrap(), SqlValue::Int(7));
        assert_eq!(decode_value(&mut src, &ti, false).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_variant_with_properties() {
        let raw = [TypeId::DecimalN as u8, 2, 5, 2, 1, 0x39, 0x30, 0, 0];
        let value = decode(&info(TypeId::Variant), &raw, false).unwrap();
        assert_eq!(value.as_numeric().unwrap().to_string(), "123.45");
        assert!(matches!(
            decode(&info(TypeId::Variant), &[0x01, 0], false),
            Err(TypeError::UnsupportedType(0x01))
        ));
    }

    #[test]
    fn test_truncated_prefix() {
        let ti = TypeInfo::new(TypeId::NVarChar, 100);
        let mut src = Bytes::from_static(&[10, 0, 0x41]);
        assert!(matches!(
            decode_value(&mut src, &ti, false),
            Err(TypeError::BufferTooSmall { .. })
        ));
    }
}
