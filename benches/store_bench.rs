//! Performance benchmarks for the persistent card store.
//!
//! The store is a linear scan over fixed-stride records, so lookup cost grows
//! with the number of stored cards and removal cost grows with the number of
//! records that must be shifted. These benchmarks track both against the
//! in-memory EEPROM.
//!
//! # Run Benchmarks
//!
//! ```sh
//! # Run all store benchmarks
//! cargo bench --bench store_bench
//!
//! # Run a single group
//! cargo bench --bench store_bench -- store_find
//!
//! # Compare against a saved baseline
//! cargo bench --bench store_bench -- --save-baseline before
//! cargo bench --bench store_bench -- --baseline before
//! ```
//!
//! # Expected Results
//!
//! - `store_find/miss` scales linearly with the fill level
//! - `store_remove/first` is the worst case (every later record moves)

use cardgate_core::CardIdentity;
use cardgate_core::constants::MAX_STORED_CARDS;
use cardgate_hardware::mock::MemoryStorage;
use cardgate_storage::CardStore;
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn identity(n: usize) -> CardIdentity {
    CardIdentity::new(&[0x04, n as u8, (n >> 8) as u8, 0xC3]).unwrap()
}

fn filled_store(count: usize) -> CardStore<MemoryStorage> {
    let mut store = CardStore::open(MemoryStorage::default()).unwrap();
    for n in 0..count {
        store.add(&identity(n)).unwrap();
    }
    store
}

/// Lookup of the last stored card and of a card that is not stored.
fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_find");
    group.throughput(Throughput::Elements(1));

    for fill in [1, 10, 20, MAX_STORED_CARDS] {
        let store = filled_store(fill);
        let last = identity(fill - 1);
        let missing = identity(10_000);

        group.bench_with_input(BenchmarkId::new("hit_last", fill), &last, |b, id| {
            b.iter(|| black_box(store.find(black_box(id))))
        });
        group.bench_with_input(BenchmarkId::new("miss", fill), &missing, |b, id| {
            b.iter(|| black_box(store.find(black_box(id))))
        });
    }

    group.finish();
}

/// Append to a store one short of capacity.
fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_add");

    group.bench_function("append_last_slot", |b| {
        b.iter_batched(
            || filled_store(MAX_STORED_CARDS - 1),
            |mut store| black_box(store.add(&identity(MAX_STORED_CARDS))),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

/// Removal with compaction at the best and worst positions.
fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_remove");

    for (name, victim) in [("first", 0), ("last", MAX_STORED_CARDS - 1)] {
        group.bench_function(name, |b| {
            b.iter_batched(
                || filled_store(MAX_STORED_CARDS),
                |mut store| black_box(store.remove(&identity(victim))),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_find, bench_add, bench_remove);
criterion_main!(benches);
