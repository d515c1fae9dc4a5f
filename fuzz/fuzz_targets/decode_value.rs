#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use mssql_types::TypeCodec;
use tds_protocol::{TypeId, TypeInfo};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    type_id: u8,
    size: u32,
    precision: u8,
    scale: u8,
    guid_conversion: bool,
    data: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let Some(type_id) = TypeId::from_u8(input.type_id) else {
        return;
    };
    let mut type_info = TypeInfo::new(type_id, input.size);
    type_info.precision = input.precision;
    type_info.scale = input.scale;

    let codec = TypeCodec::new().with_guid_conversion(input.guid_conversion);
    let _ = codec.decode(&type_info, &input.data);
    let _ = codec.decode_value(&mut Bytes::from(input.data), &type_info);
});
