#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use tds_protocol::collation::Collation;

#[derive(Debug, Arbitrary)]
struct FuzzCollationInput {
    /// Raw 5-byte collation.
    collation_bytes: [u8; 5],
    /// Narrow string bytes to decode under it.
    string_data: Vec<u8>,
}

fuzz_target!(|input: FuzzCollationInput| {
    let mut bytes = Bytes::copy_from_slice(&input.collation_bytes);
    if let Ok(collation) = Collation::decode(&mut bytes) {
        let _ = collation.lcid();
        let _ = collation.flags();
        let _ = collation.is_utf8();
        let charset = collation.charset();
        let _ = charset.name();

        let text = charset.decode(&input.string_data);
        let _ = charset.encode(&text);
    }
});
