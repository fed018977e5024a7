//! Benchmarks for the outbound replay buffer.
//!
//! These benchmarks measure buffering below and at capacity, where every
//! push evicts the oldest message.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use nlp_plugin_bridge::ReplayBuffer;
use nlp_plugin_core::{Action, Message};
use std::hint::black_box;

fn message(id: i32) -> Message {
    Message::request_to_service(Action::Spell, id, Some(r#"{"subtypeId":0,"word":"helo"}"#.into()))
}

/// Benchmarks filling and draining buffers of various capacities
fn bench_fill_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay_fill_drain");

    for capacity in [8_usize, 64, 512] {
        group.throughput(Throughput::Elements(capacity as u64));
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            let buffer = ReplayBuffer::new(capacity);
            b.iter(|| {
                for id in 0..capacity {
                    buffer.push(message(i32::try_from(id).unwrap_or(i32::MAX)));
                }
                while let Some(m) = buffer.try_pop() {
                    black_box(m);
                }
            });
        });
    }

    group.finish();
}

/// Benchmarks pushing into a full buffer
fn bench_overflow(c: &mut Criterion) {
    let buffer = ReplayBuffer::new(8);
    for id in 0..8 {
        buffer.push(message(id));
    }

    c.bench_function("replay_push_evicting", |b| {
        b.iter(|| black_box(buffer.push(message(black_box(99)))));
    });
}

/// Benchmarks the awaited pop path on a multi-threaded runtime
fn bench_async_pop(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let buffer = ReplayBuffer::new(8);

    c.bench_function("replay_async_pop", |b| {
        b.to_async(&runtime).iter(|| async {
            buffer.push(message(1));
            black_box(buffer.pop().await)
        });
    });
}

criterion_group!(benches, bench_fill_and_drain, bench_overflow, bench_async_pop);
criterion_main!(benches);
