//! Benchmarks for value broadcast and subscription churn.
//!
//! Run with: `cargo bench --package valuecast --bench broadcast_bench`
//!
//! `set` clones the value once, snapshots the handler list and calls every
//! handler inside a panic boundary, so cost is expected to grow linearly with
//! the subscriber count.

use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use valuecast::{ValueDispatcher, sync};

const SUBSCRIBER_COUNTS: [usize; 4] = [1, 8, 64, 512];

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");
    for &count in &SUBSCRIBER_COUNTS {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("local", count), &count, |b, &count| {
            let dispatcher = ValueDispatcher::new(0u64);
            let sum = Rc::new(Cell::new(0u64));
            let _handles: Vec<_> = (0..count)
                .map(|_| {
                    let sum = Rc::clone(&sum);
                    dispatcher.subscribe_with(move |v| sum.set(sum.get().wrapping_add(*v)), false)
                })
                .collect();
            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                dispatcher.set(black_box(next)).unwrap();
            });
            black_box(sum.get());
        });

        group.bench_with_input(BenchmarkId::new("sync", count), &count, |b, &count| {
            let dispatcher = sync::ValueDispatcher::new(0u64);
            let sum = Arc::new(AtomicU64::new(0));
            let _handles: Vec<_> = (0..count)
                .map(|_| {
                    let sum = Arc::clone(&sum);
                    dispatcher.subscribe_with(
                        move |v| {
                            sum.fetch_add(*v, Ordering::Relaxed);
                        },
                        false,
                    )
                })
                .collect();
            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                dispatcher.set(black_box(next)).unwrap();
            });
            black_box(sum.load(Ordering::Relaxed));
        });
    }
    group.finish();
}

fn bench_subscribe_unsubscribe(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscribe_unsubscribe");
    for &count in &SUBSCRIBER_COUNTS {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let dispatcher = ValueDispatcher::new(0u32);
            let _background: Vec<_> = (0..count)
                .map(|_| dispatcher.subscribe_with(|_| {}, false))
                .collect();
            b.iter(|| {
                let handle = dispatcher.subscribe_with(
                    |v| {
                        black_box(*v);
                    },
                    false,
                );
                black_box(handle.unsubscribe())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_set, bench_subscribe_unsubscribe);
criterion_main!(benches);
