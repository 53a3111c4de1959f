//! Benchmarks for the geodemand indices
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use geodemand::index::{BlockArena, BlockChain, GeohashIndex, TimeIndex};
use geodemand::{parse_record, IndexManager, Record, RecordId};

fn create_test_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            format!(
                "qp{:04},{},{:02}:{:02},{}\n",
                i % 1300,
                1 + i % 61,
                i % 24,
                (i % 4) * 15,
                i as f64 * 0.001
            )
        })
        .collect()
}

fn create_test_records(count: usize) -> Vec<Record> {
    create_test_lines(count)
        .iter()
        .map(|line| parse_record(line.as_bytes()).unwrap())
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let lines = create_test_lines(1000);

    group.throughput(Throughput::Elements(lines.len() as u64));
    group.bench_function("parse_1000", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(parse_record(black_box(line.as_bytes())).unwrap());
            }
        })
    });

    group.finish();
}

fn bench_block_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_chain");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("append_{}", size), |b| {
            b.iter(|| {
                let mut arena = BlockArena::new();
                let mut chain = BlockChain::new();
                for i in 0..size {
                    arena.append(&mut chain, RecordId(i)).unwrap();
                }
                black_box(arena.chain_len(chain))
            })
        });
    }

    group.finish();
}

fn bench_indices(c: &mut Criterion) {
    let mut group = c.benchmark_group("indices");
    let records = create_test_records(10000);

    group.throughput(Throughput::Elements(records.len() as u64));

    group.bench_function("time_insert_10000", |b| {
        b.iter_batched(
            TimeIndex::new,
            |mut index| {
                for (i, record) in records.iter().enumerate() {
                    index.insert(RecordId(i as u32), record).unwrap();
                }
                index
            },
            BatchSize::LargeInput,
        )
    });

    group.bench_function("geohash_insert_10000", |b| {
        b.iter_batched(
            GeohashIndex::new,
            |mut index| {
                for (i, record) in records.iter().enumerate() {
                    index.insert(RecordId(i as u32), record, true).unwrap();
                }
                index
            },
            BatchSize::LargeInput,
        )
    });

    group.bench_function("ingest_10000", |b| {
        let lines = create_test_lines(10000);
        b.iter(|| {
            let mut manager = IndexManager::new();
            for line in &lines {
                manager.ingest_line(line.as_bytes()).unwrap();
            }
            black_box(manager.store().len())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_block_chain, bench_indices);
criterion_main!(benches);
