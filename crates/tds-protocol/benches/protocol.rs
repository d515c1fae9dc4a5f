//! Benchmarks for TDS metadata decoding and collation transcoding.

#![allow(clippy::unwrap_used, missing_docs)]

use bytes::{Bytes, BytesMut};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use tds_protocol::{
    CekTable, CekTableEntry, CekValue, ColMetaData, Collation, ColumnDescriptor, CryptoMetadata,
    EncryptionType, TypeId, TypeInfo, crypto::ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256,
};

fn sample_metadata() -> ColMetaData {
    let collation = Collation::new(0x00D0_0409, 0x34);
    let crypto = CryptoMetadata {
        cek_table_ordinal: 0,
        user_type: 0,
        base_type: TypeInfo::new(TypeId::NVarChar, 100).with_collation(collation),
        algorithm_id: ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256,
        algorithm_name: None,
        encryption_type: EncryptionType::Deterministic,
        normalization_version: 1,
    };

    ColMetaData {
        cek_table: CekTable {
            entries: vec![CekTableEntry {
                database_id: 5,
                cek_id: 1,
                cek_version: 1,
                cek_md_version: [0; 8],
                values: vec![CekValue {
                    encrypted_value: Bytes::from(vec![0xAB; 256]),
                    key_store_provider_name: "MSSQL_CERTIFICATE_STORE".into(),
                    cmk_path: "CurrentUser/My/0123456789ABCDEF0123456789ABCDEF01234567".into(),
                    encryption_algorithm: "RSA_OAEP".into(),
                }],
            }],
        },
        columns: vec![
            ColumnDescriptor::new("id", TypeInfo::fixed(TypeId::Int4)),
            ColumnDescriptor::new("amount", TypeInfo::decimal(18, 4)),
            ColumnDescriptor::new("created", TypeInfo::scaled(TypeId::DateTime2, 7)),
            ColumnDescriptor::new(
                "name",
                TypeInfo::new(TypeId::BigVarChar, 200).with_collation(collation),
            ),
            ColumnDescriptor::encrypted("ssn", crypto),
        ],
    }
}

/// Benchmark COLMETADATA decoding with an encrypted column.
fn bench_colmetadata_decode(c: &mut Criterion) {
    let mut buf = BytesMut::new();
    sample_metadata().encode(&mut buf, true);
    let encoded = buf.freeze();

    c.bench_function("colmetadata_decode", |b| {
        b.iter(|| {
            let mut cursor = encoded.clone();
            let decoded = ColMetaData::decode(&mut cursor, true).unwrap();
            black_box(decoded)
        })
    });
}

/// Benchmark code-page decoding of VARCHAR payloads.
fn bench_charset_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("charset_decode");

    let latin = vec![b'a'; 4000];
    let cp1252 = Collation::new(0x00D0_0409, 0).charset();
    group.throughput(Throughput::Bytes(latin.len() as u64));
    group.bench_function("cp1252", |b| {
        b.iter(|| black_box(cp1252.decode(black_box(&latin))))
    });

    let sjis = cp_bytes_for_japanese();
    let cp932 = Collation::new(0x0411, 0).charset();
    group.throughput(Throughput::Bytes(sjis.len() as u64));
    group.bench_function("cp932", |b| {
        b.iter(|| black_box(cp932.decode(black_box(&sjis))))
    });

    let oem = vec![0x82u8; 4000];
    let cp437 = Collation::new(0x0409, 30).charset();
    group.throughput(Throughput::Bytes(oem.len() as u64));
    group.bench_function("cp437", |b| {
        b.iter(|| black_box(cp437.decode(black_box(&oem))))
    });

    group.finish();
}

fn cp_bytes_for_japanese() -> Vec<u8> {
    // "日本語" in Shift_JIS, repeated.
    [0x93, 0xFA, 0x96, 0x7B, 0x8C, 0xEA].repeat(600)
}

criterion_group!(benches, bench_colmetadata_decode, bench_charset_decode);

criterion_main!(benches);
