//! Detector Benchmark Suite
//!
//! # Scenarios
//!
//! 1. **AB-BA**: the two-task cycle the lock-ordering harness produces
//! 2. **Ring**: N tasks each holding one resource and waiting for the next
//! 3. **Chain**: N tasks waiting down a line that ends at a running task
//!    (worst case for "no cycle" answers)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hazard_twin::{DeadlockDetector, ResourceId, Snapshot, TaskId, TaskState};

fn resource(i: usize) -> ResourceId {
    // Private-use plane keeps ids distinct for any benchmark size
    let c = u32::try_from(i)
        .ok()
        .and_then(|i| char::from_u32(0xE000 + i))
        .unwrap_or('?');
    ResourceId::new(c)
}

fn ring(n: usize) -> Snapshot {
    (0..n).fold(Snapshot::new(), |snapshot, i| {
        snapshot.with_task(
            TaskId(i),
            TaskState::HoldingAndBlocked {
                held: resource(i),
                waiting_for: resource((i + 1) % n),
            },
        )
    })
}

fn chain(n: usize) -> Snapshot {
    let snapshot = (0..n - 1).fold(Snapshot::new(), |snapshot, i| {
        snapshot.with_task(
            TaskId(i),
            TaskState::HoldingAndBlocked {
                held: resource(i),
                waiting_for: resource(i + 1),
            },
        )
    });
    snapshot
        .with_task(TaskId(n - 1), TaskState::Running)
        .with_holder(resource(n - 1), TaskId(n - 1))
}

fn bench_ab_ba(c: &mut Criterion) {
    let detector = DeadlockDetector::new();
    let snapshot = ring(2);

    c.bench_function("ab_ba_detect", |b| {
        b.iter(|| detector.detect(black_box(&snapshot)))
    });
}

fn bench_shapes(c: &mut Criterion) {
    let detector = DeadlockDetector::new();
    let mut group = c.benchmark_group("detector_shapes");

    for n in [8, 32, 128] {
        let cyclic = ring(n);
        group.bench_with_input(BenchmarkId::new("ring", n), &cyclic, |b, s| {
            b.iter(|| detector.analyze(black_box(s)))
        });

        let acyclic = chain(n);
        group.bench_with_input(BenchmarkId::new("chain", n), &acyclic, |b, s| {
            b.iter(|| detector.detect(black_box(s)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ab_ba, bench_shapes);
criterion_main!(benches);
