#![no_main]

use arbitrary::Arbitrary;
use bytes::{Bytes, BytesMut};
use libfuzzer_sys::fuzz_target;
use mssql_types::{SqlValue, TypeCodec, param_type_info};

#[derive(Debug, Arbitrary)]
enum FuzzSqlValue {
    Null,
    Bool(bool),
    TinyInt(u8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    Guid([u8; 16]),
}

fuzz_target!(|input: FuzzSqlValue| {
    let value = match input {
        FuzzSqlValue::Null => SqlValue::Null,
        FuzzSqlValue::Bool(v) => SqlValue::Bool(v),
        FuzzSqlValue::TinyInt(v) => SqlValue::TinyInt(v),
        FuzzSqlValue::SmallInt(v) => SqlValue::SmallInt(v),
        FuzzSqlValue::Int(v) => SqlValue::Int(v),
        FuzzSqlValue::BigInt(v) => SqlValue::BigInt(v),
        FuzzSqlValue::Double(v) if v.is_nan() => return,
        FuzzSqlValue::Double(v) => SqlValue::Double(v),
        FuzzSqlValue::String(v) => SqlValue::String(v),
        FuzzSqlValue::Binary(v) => SqlValue::Binary(Bytes::from(v)),
        FuzzSqlValue::Guid(v) => SqlValue::Guid(uuid::Uuid::from_bytes(v)),
    };

    let codec = TypeCodec::new();
    let type_info = param_type_info(&value);
    let mut dst = BytesMut::new();
    codec.encode_value(&mut dst, &type_info, &value).expect("encode");
    let back = codec
        .decode_value(&mut dst.freeze(), &type_info)
        .expect("decode");
    assert_eq!(back, value);
});
