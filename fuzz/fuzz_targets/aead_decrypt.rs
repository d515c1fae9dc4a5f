#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mssql_encryption::AeadCodec;
use tds_protocol::EncryptionType;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    root_key: [u8; 32],
    randomized: bool,
    ciphertext: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let encryption_type = if input.randomized {
        EncryptionType::Randomized
    } else {
        EncryptionType::Deterministic
    };
    let Ok(codec) = AeadCodec::from_root_key(&input.root_key, encryption_type) else {
        return;
    };

    // Arbitrary input must never authenticate.
    let _ = codec.decrypt(&input.ciphertext);

    let cipher = codec.encrypt(&input.ciphertext).expect("encrypt");
    assert_eq!(codec.decrypt(&cipher).expect("decrypt"), input.ciphertext);
});
