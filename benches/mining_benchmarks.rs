//! Performance benchmarks for the hashing primitives and mining attempts

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use pow_mining_client::{
    crypto::{Scrypt, ScryptParams, Sha256},
    worker::sha256d::Sha256dEngine,
    BlockHeader, BlockTime, CompactBits, Nonce, Target,
};

fn bench_header() -> BlockHeader {
    BlockHeader::from_display_hex(
        1,
        "000000006a625f06636b8bb6ac7b960a8d03705d1ace08b1a19da3fdcc99ddbd",
        "999e1c837c76a1b7fbb7e57baf87b309960f5ffefbf2a9b95dd890602272f644",
        BlockTime::new(1_231_379_902),
        CompactBits::new(0x1d00_ffff),
        Nonce::new(0),
    )
    .unwrap()
}

fn bench_sha256(c: &mut Criterion) {
    let header = bench_header();
    let bytes = header.serialize();

    c.bench_function("sha256_80_bytes", |b| {
        let mut engine = Sha256::new();
        b.iter(|| black_box(engine.digest32(black_box(&bytes))));
    });

    c.bench_function("sha256d_80_bytes", |b| {
        let mut engine = Sha256::new_double();
        b.iter(|| black_box(engine.digest32(black_box(&bytes))));
    });
}

fn bench_mining_attempt(c: &mut Criterion) {
    let header = bench_header();

    c.bench_function("sha256d_midstate_attempt", |b| {
        let mut engine = Sha256dEngine::new(&header).unwrap();
        let mut nonce = Nonce::new(0);
        b.iter(|| {
            engine.set_nonce(nonce);
            let _ = nonce.increment();
            black_box(engine.attempt())
        });
    });
}

fn bench_scrypt(c: &mut Criterion) {
    let header = bench_header();
    let bytes = header.serialize();

    c.bench_function("scrypt_pow_derive", |b| {
        let mut scrypt = Scrypt::new(ScryptParams::proof_of_work());
        b.iter(|| black_box(scrypt.derive(black_box(&bytes), black_box(&bytes), 32).unwrap()));
    });
}

fn bench_target_checking(c: &mut Criterion) {
    let target = Target::from_compact(CompactBits::new(0x1d00_ffff)).unwrap();
    let state = [0x0000_1234u32, 0xdead_beef, 0, 0, 0, 0, 0, 0x99];

    c.bench_function("target_check_state", |b| {
        b.iter(|| black_box(target.is_met_state_le(black_box(&state))));
    });
}

criterion_group!(
    benches,
    bench_sha256,
    bench_mining_attempt,
    bench_scrypt,
    bench_target_checking
);
criterion_main!(benches);
