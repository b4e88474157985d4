//! Ring buffer write/read throughput benchmark.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ring_buffer::RingBuffer;

fn bench_write_read_cycle(c: &mut Criterion) {
    let (mut producer, mut consumer) = RingBuffer::with_capacity(4096, 64)
        .expect("valid capacity")
        .split();
    let sample = [0x5Au8; 64];
    let mut out = [0u8; 64];

    c.bench_function("write_read_64b", |b| {
        b.iter(|| {
            producer.write(black_box(&sample));
            consumer.read(black_box(&mut out));
        })
    });
}

fn bench_write_until_full(c: &mut Criterion) {
    c.bench_function("fill_4096b", |b| {
        b.iter(|| {
            let (mut producer, _consumer) = RingBuffer::with_capacity(4096, 64)
                .expect("valid capacity")
                .split();
            let sample = [0x5Au8; 64];
            while producer.write(black_box(&sample)) != 0 {}
        })
    });
}

criterion_group!(benches, bench_write_read_cycle, bench_write_until_full);
criterion_main!(benches);
