use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use libseqz::prelude::*;

fn bench_codec(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let input = generate_sequence(
        &mut rng,
        b"ACGTN",
        Some(&[0.32, 0.28, 0.21, 0.18, 0.01]),
        1 << 20,
    );
    let seq = compress_auto(&input, false, false).unwrap();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("compress", |b| {
        b.iter(|| compress_auto(black_box(&input), false, false).unwrap())
    });
    group.bench_function("decompress", |b| {
        b.iter(|| decompress(black_box(&seq)).unwrap())
    });
    group.finish();

    let mut group = c.benchmark_group("random_access");
    group.bench_function("substring_1k", |b| {
        b.iter(|| decompress_range(black_box(&seq), 900_000, 1_000).unwrap())
    });
    group.bench_function("strpos_tail", |b| {
        let needle = &input[input.len() - 48..];
        b.iter(|| strpos(black_box(&seq), black_box(needle)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
