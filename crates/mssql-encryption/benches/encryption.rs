//! Benchmarks for cell encryption and the CEK cache.

#![allow(clippy::unwrap_used, missing_docs)]

use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use mssql_encryption::{AeadCodec, CekCache, CellKey};
use tds_protocol::EncryptionType;

const ROOT_KEY: [u8; 32] = [0x42; 32];

fn bench_key_derivation(c: &mut Criterion) {
    c.bench_function("cell_key_derive", |b| {
        b.iter(|| CellKey::derive(black_box(&ROOT_KEY)).unwrap())
    });
}

fn bench_aead(c: &mut Criterion) {
    let mut group = c.benchmark_group("aead");
    for encryption_type in [EncryptionType::Deterministic, EncryptionType::Randomized] {
        let codec = AeadCodec::from_root_key(&ROOT_KEY, encryption_type).unwrap();
        for size in [16usize, 256, 4096] {
            let plaintext = vec![0xA5u8; size];
            let ciphertext = codec.encrypt(&plaintext).unwrap();
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("encrypt_{}", encryption_type.name()), size),
                &plaintext,
                |b, p| b.iter(|| codec.encrypt(black_box(p)).unwrap()),
            );
            group.bench_with_input(
                BenchmarkId::new(format!("decrypt_{}", encryption_type.name()), size),
                &ciphertext,
                |b, ct| b.iter(|| codec.decrypt(black_box(ct)).unwrap()),
            );
        }
    }
    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let cache = CekCache::new();
    let encrypted = vec![7u8; 512];
    cache.insert(
        "/keys/bench.pem",
        &encrypted,
        ROOT_KEY.to_vec(),
        Duration::from_secs(3600),
    );
    c.bench_function("cek_cache_hit", |b| {
        b.iter(|| cache.get(black_box("/keys/bench.pem"), black_box(&encrypted)).unwrap())
    });
}

criterion_group!(benches, bench_key_derivation, bench_aead, bench_cache);
criterion_main!(benches);
