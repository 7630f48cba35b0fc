use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringflux::{Config, MsQueue, RingBuffer, TreiberStack};
use std::sync::Arc;
use std::thread;

const MSG_PER_PRODUCER: u64 = 200_000;

fn bench_ring_mpmc(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer_mpmc");
    for &producers in &[1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements(MSG_PER_PRODUCER * producers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(producers),
            &producers,
            |b, &producers| {
                b.iter(|| {
                    let ring = Arc::new(RingBuffer::<u64>::new(Config::new(4096, false)));
                    let handles: Vec<_> = (0..producers)
                        .map(|_| {
                            let ring = ring.clone();
                            thread::spawn(move || {
                                for i in 0..MSG_PER_PRODUCER {
                                    while !ring.enqueue(black_box(i)) {
                                        thread::yield_now();
                                    }
                                }
                            })
                        })
                        .collect();
                    let total = MSG_PER_PRODUCER * producers as u64;
                    let mut received = 0u64;
                    while received < total {
                        if ring.dequeue().is_some() {
                            received += 1;
                        } else {
                            thread::yield_now();
                        }
                    }
                    for h in handles {
                        h.join().unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_ms_queue(c: &mut Criterion) {
    c.bench_function("ms_queue_single_thread_round_trip", |b| {
        let q = MsQueue::<u64>::new(4096);
        b.iter(|| {
            for i in 0..4096u64 {
                q.enqueue(black_box(i));
            }
            while q.dequeue().is_some() {}
        });
    });
}

fn bench_treiber_stack(c: &mut Criterion) {
    c.bench_function("treiber_stack_single_thread_round_trip", |b| {
        let s = TreiberStack::<u64>::new(4096);
        b.iter(|| {
            for i in 0..4096u64 {
                s.push(black_box(i));
            }
            while s.pop().is_some() {}
        });
    });
}

criterion_group!(benches, bench_ring_mpmc, bench_ms_queue, bench_treiber_stack);
criterion_main!(benches);
