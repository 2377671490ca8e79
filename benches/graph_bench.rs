//! Benchmarks for task graph scheduling.
//!
//! Benchmarks cover:
//! - Per-frame register/run/reset cycles of independent tasks
//! - Fan-out wakeup cost (one producer, many parked waiters)
//! - Suspend/resume cost along a dependency chain
//! - Graph construction (worker pool spawn and join)

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use taskgraph::{Graph, TaskId};

// ============================================================================
// Frame Cycle Benchmarks
// ============================================================================

fn bench_frame_rerun(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_rerun");

    for size in [8usize, 32, 128] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut graph = Graph::new(4, size);
            b.iter(|| {
                for i in 0..size {
                    graph.add(TaskId::new(i), |_ctx| async {});
                }
                graph.run();
                black_box(graph.stats().completed_tasks);
                graph.reset();
            });
        });
    }
    group.finish();
}

fn bench_fanout_wakeup(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout_wakeup");

    for waiters in [4usize, 16, 64] {
        group.throughput(Throughput::Elements(waiters as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(waiters),
            &waiters,
            |b, &waiters| {
                let mut graph = Graph::new(4, waiters + 1);
                b.iter(|| {
                    // Waiters are registered first so most of them park
                    // before the producer's raise.
                    for i in 0..waiters {
                        graph.add(TaskId::new(i), move |ctx| async move {
                            ctx.wait(TaskId::new(waiters)).await;
                        });
                    }
                    graph.add(TaskId::new(waiters), |_ctx| async {});
                    graph.run();
                    graph.reset();
                });
            },
        );
    }
    group.finish();
}

fn bench_chain_resume(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_resume");

    for depth in [4usize, 16, 64] {
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut graph = Graph::new(2, depth);
            b.iter(|| {
                for i in 0..depth {
                    graph.add(TaskId::new(i), move |ctx| async move {
                        if i + 1 < depth {
                            ctx.wait(TaskId::new(i + 1)).await;
                        }
                    });
                }
                graph.run();
                graph.reset();
            });
        });
    }
    group.finish();
}

// ============================================================================
// Construction Benchmarks
// ============================================================================

fn bench_graph_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_construction");

    for workers in [1usize, 4] {
        group.bench_with_input(
            BenchmarkId::from_parameter(workers),
            &workers,
            |b, &workers| {
                b.iter(|| {
                    let graph = Graph::new(workers, 16);
                    black_box(graph.worker_count());
                });
            },
        );
    }
    group.finish();
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(
    cycle_benches,
    bench_frame_rerun,
    bench_fanout_wakeup,
    bench_chain_resume
);

criterion_group!(setup_benches, bench_graph_construction);

criterion_main!(cycle_benches, setup_benches);
