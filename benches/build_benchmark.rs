//! Benchmarks for index construction.
//!
//! Run with: cargo bench
//!
//! Measures bucket partitioning and packing throughput over synthetic
//! range tables at several table sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ipidx::index::{partition, BucketPacker, IndexKind, COUNTRY_BUCKET_COUNT};
use ipidx::AddressFamily;

/// Synthetic v4 tables: `rows` adjacent ranges of width 16.
fn generate_tables(rows: usize) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let mut starts = Vec::with_capacity(rows * 4);
    let mut ends = Vec::with_capacity(rows * 4);
    let mut payload = Vec::with_capacity(rows * 2);
    for j in 0..rows as u32 {
        starts.extend_from_slice(&(j * 16).to_le_bytes());
        ends.extend_from_slice(&(j * 16 + 15).to_le_bytes());
        payload.extend_from_slice(&((j % 676 + 1) as u16).to_le_bytes());
    }
    (starts, ends, payload)
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");
    for rows in [10_000, 100_000, 1_000_000] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter(|| partition(black_box(rows), COUNTRY_BUCKET_COUNT));
        });
    }
    group.finish();
}

fn bench_pack_country(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_country");
    for rows in [10_000usize, 100_000, 1_000_000] {
        let (starts, ends, payload) = generate_tables(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            let packer = BucketPacker::new(
                AddressFamily::V4,
                IndexKind::Country,
                &starts,
                &ends,
                &payload,
            );
            let buckets = partition(rows, COUNTRY_BUCKET_COUNT);
            b.iter(|| {
                for &(lo, hi) in &buckets {
                    black_box(packer.pack(lo, hi).unwrap());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_partition, bench_pack_country);
criterion_main!(benches);
