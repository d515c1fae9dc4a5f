#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use tds_protocol::ColMetaData;
use tds_protocol::crypto::{CekTableEntry, CryptoMetadata};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    column_encryption: bool,
    data: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let _ = CryptoMetadata::decode(&mut Bytes::copy_from_slice(&input.data));
    let _ = CekTableEntry::decode(&mut Bytes::copy_from_slice(&input.data));
    let _ = ColMetaData::decode(&mut Bytes::from(input.data), input.column_encryption);
});
