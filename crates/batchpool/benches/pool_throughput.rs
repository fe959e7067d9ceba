//! Batch throughput benchmark
//!
//! Measures a full batch (start → submit → drain → summary) across worker
//! counts, with random per-task latencies.

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use tokio::runtime::Runtime;

use batchpool::{new_pool, Task, TaskResult};

const TASK_COUNT: usize = 200;

/// Batch of tasks that return immediately (pool overhead only)
fn bench_instant_tasks(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("pool_throughput/instant");
    group.throughput(Throughput::Elements(TASK_COUNT as u64));

    for workers in [1, 4, 16] {
        group.bench_with_input(
            BenchmarkId::new("workers", workers),
            &workers,
            |b, &workers| {
                b.to_async(&rt).iter(|| async move {
                    let pool = new_pool(
                        workers,
                        TASK_COUNT,
                        Duration::from_secs(1),
                        |_task: Task| async { TaskResult::Ok(()) },
                    )
                    .unwrap();
                    let summary = pool.run_to_completion().await.unwrap();
                    assert_eq!(summary.completed_count, TASK_COUNT);
                });
            },
        );
    }

    group.finish();
}

/// Batch with random latencies up to 500µs, a tenth of them over the timeout
fn bench_random_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("pool_throughput/random_latency");
    group.throughput(Throughput::Elements(TASK_COUNT as u64));
    group.sample_size(20);

    for workers in [4, 16] {
        group.bench_with_input(
            BenchmarkId::new("workers", workers),
            &workers,
            |b, &workers| {
                b.to_async(&rt).iter(|| async move {
                    let latencies: Arc<Vec<u64>> = {
                        let mut rng = rand::thread_rng();
                        Arc::new(
                            (0..TASK_COUNT)
                                .map(|i| if i % 10 == 9 { 5_000 } else { rng.gen_range(0..500) })
                                .collect(),
                        )
                    };

                    let pool = new_pool(
                        workers,
                        TASK_COUNT,
                        Duration::from_millis(2),
                        move |task: Task| {
                            let latencies = Arc::clone(&latencies);
                            async move {
                                let micros = latencies[(task.id.get() - 1) as usize];
                                tokio::time::sleep(Duration::from_micros(micros)).await;
                                TaskResult::Ok(())
                            }
                        },
                    )
                    .unwrap();

                    let summary = pool.run_to_completion().await.unwrap();
                    assert_eq!(summary.total(), TASK_COUNT);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_instant_tasks, bench_random_latency);
criterion_main!(benches);
