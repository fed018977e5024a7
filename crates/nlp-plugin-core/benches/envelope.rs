//! Benchmarks for header packing and frame encoding.

use criterion::{Criterion, criterion_group, criterion_main};
use nlp_plugin_core::message::{self, Action, Frame, Message};
use std::hint::black_box;

fn bench_header_round_trip(c: &mut Criterion) {
    c.bench_function("header_encode_decode", |b| {
        b.iter(|| message::decode(message::encode(black_box(2), black_box(1), black_box(3))));
    });
}

fn bench_frame_lines(c: &mut Criterion) {
    let payload = r#"{"subtypeId":0,"word":"helo","precedingWords":["say"],"followingWords":[]}"#;
    let message = Message::request_to_service(Action::Suggest, 42, Some(payload.to_string()));
    let line = message.to_frame().to_line().unwrap();

    let mut group = c.benchmark_group("frame");
    group.bench_function("to_line", |b| {
        b.iter(|| black_box(&message).to_frame().to_line().unwrap());
    });
    group.bench_function("from_line", |b| {
        b.iter(|| Message::from_frame(Frame::from_line(black_box(&line)).unwrap()).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_header_round_trip, bench_frame_lines);
criterion_main!(benches);
