//! Booking Performance Benchmarks
//!
//! - Seat planning: pure countdown allocation
//! - Purchase throughput against the in-memory store
//! - Read paths over the seeded sample catalog
//! - Contended vs. spread-out concurrent purchases
//!
//! Run with: `cargo bench -p cinema-core`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup

use chrono::Utc;
use cinema_core::engine::ReservationEngine;
use cinema_core::memory::InMemoryStore;
use cinema_core::query::QueryLayer;
use cinema_core::seating::{CountdownAllocator, reserve_seats};
use cinema_core::seed::{SampleCatalogOptions, seed_sample_catalog};
use cinema_core::{Capacity, Customer, Money, ScreeningId};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::sync::Arc;

/// Large enough that benchmark iterations never sell out.
const BENCH_CAPACITY: u32 = 4_000_000_000;

fn seeded_store(runtime: &tokio::runtime::Runtime, capacity: u32) -> Arc<InMemoryStore> {
    runtime.block_on(async {
        let store = Arc::new(InMemoryStore::new());
        let options = SampleCatalogOptions {
            days: 7,
            capacity: Capacity::new(capacity),
        };
        seed_sample_catalog(store.as_ref(), Utc::now(), &options)
            .await
            .expect("seed");
        store
    })
}

fn benchmark_seat_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("seat_planning");

    for seat_count in [1u32, 4, 16] {
        group.throughput(Throughput::Elements(u64::from(seat_count)));
        group.bench_with_input(BenchmarkId::from_parameter(seat_count), &seat_count, |b, &n| {
            b.iter(|| {
                reserve_seats(
                    ScreeningId::new(1),
                    black_box(100),
                    Money::from_minor(40_000),
                    black_box(n),
                    &CountdownAllocator,
                )
            });
        });
    }

    group.finish();
}

fn benchmark_purchase_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("purchase_throughput");
    group.throughput(Throughput::Elements(1));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    let store = seeded_store(&runtime, BENCH_CAPACITY);
    let engine = ReservationEngine::new(Arc::clone(&store));
    let customer = Customer::new("Bench", "bench@example.com");

    group.bench_function("single_seat", |b| {
        b.to_async(&runtime).iter(|| async {
            let _ = engine
                .purchase(black_box(ScreeningId::new(1)), &customer, 1)
                .await;
        });
    });

    group.finish();
}

fn benchmark_read_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_paths");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    let store = seeded_store(&runtime, Capacity::STANDARD.value());
    let queries = QueryLayer::new(Arc::clone(&store));
    let engine = ReservationEngine::new(Arc::clone(&store));
    runtime.block_on(async {
        for screening in 1..=20 {
            let _ = engine
                .purchase(
                    ScreeningId::new(screening),
                    &Customer::new("Reader", "reader@example.com"),
                    1,
                )
                .await;
        }
    });

    group.bench_function("available_movies", |b| {
        b.to_async(&runtime).iter(|| async {
            let _ = queries.available_movies(black_box(Utc::now())).await;
        });
    });

    group.bench_function("purchase_history", |b| {
        b.to_async(&runtime).iter(|| async {
            let _ = queries.purchase_history(black_box("reader@example.com")).await;
        });
    });

    group.finish();
}

fn benchmark_concurrent_purchases(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_purchases");
    group.throughput(Throughput::Elements(100));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    let store = seeded_store(&runtime, BENCH_CAPACITY);
    let engine = ReservationEngine::new(Arc::clone(&store));

    for (name, spread) in [("one_screening", 1i64), ("forty_screenings", 40)] {
        group.bench_function(name, |b| {
            b.to_async(&runtime).iter(|| async {
                let handles: Vec<_> = (0..100i64)
                    .map(|n| {
                        let engine = engine.clone();
                        tokio::spawn(async move {
                            let customer = Customer::new("Bench", "bench@example.com");
                            engine
                                .purchase(ScreeningId::new(n % spread + 1), &customer, 1)
                                .await
                        })
                    })
                    .collect();

                for handle in handles {
                    let _ = handle.await.expect("Task failed");
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_seat_planning,
    benchmark_purchase_throughput,
    benchmark_read_paths,
    benchmark_concurrent_purchases,
);
criterion_main!(benches);
