//! Benchmarks for the frame codec, masking, buffers and handshake helpers.
//!
//! Run with: `cargo bench`

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use wsframe::buffer::{Buffer, ByteBuffer, CompositeBuffer};
use wsframe::config::Limits;
use wsframe::connection::Fragmenter;
use wsframe::protocol::{
    Frame, MessageAssembler, OpCode, apply_mask, apply_mask_fast, compute_accept_key, decode,
    encode, encode_into,
};

const MASK: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];
const SIZES: [(&str, usize); 3] = [("10b", 10), ("1kb", 1024), ("64kb", 65536)];

fn wire(payload_size: usize, masked: bool) -> Vec<u8> {
    let mut frame = Frame::binary(vec![0xAB; payload_size]);
    if masked {
        frame = frame.with_mask(MASK);
    }
    encode(&frame).unwrap().to_vec()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for (name, size) in SIZES {
        let unmasked = wire(size, false);
        let masked = wire(size, true);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{name}_unmasked"), |b| {
            b.iter(|| decode(&mut ByteBuffer::wrap(black_box(unmasked.clone()))))
        });
        group.bench_function(format!("{name}_masked"), |b| {
            b.iter(|| decode(&mut ByteBuffer::wrap(black_box(masked.clone()))))
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for (name, size) in SIZES {
        let frame = Frame::binary(vec![0xAB; size]);
        let masked = frame.clone().with_mask(MASK);
        let mut buf = ByteBuffer::new(masked.wire_size());

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{name}_unmasked"), |b| {
            b.iter(|| encode(black_box(&frame)))
        });
        group.bench_function(format!("{name}_masked_reused_buffer"), |b| {
            b.iter(|| {
                buf.clear();
                encode_into(black_box(&masked), &mut buf)
            })
        });
    }

    group.finish();
}

fn bench_masking(c: &mut Criterion) {
    let mut group = c.benchmark_group("masking");

    for (name, size) in SIZES {
        let mut data = vec![0xAB; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{name}_bytewise"), |b| {
            b.iter(|| apply_mask(black_box(&mut data), MASK))
        });
        group.bench_function(format!("{name}_wordwise"), |b| {
            b.iter(|| apply_mask_fast(black_box(&mut data), MASK))
        });
    }

    group.finish();
}

fn bench_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite");

    let mut composite = CompositeBuffer::new();
    for _ in 0..64 {
        composite.add_component(ByteBuffer::wrap(vec![0x5A; 1024]));
    }
    let size = composite.size();

    group.bench_function("sequential_get_byte", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for index in (0..size).step_by(97) {
                sum += u64::from(composite.get_byte(index).unwrap());
            }
            sum
        })
    });

    group.bench_function("scattered_find_component", |b| {
        b.iter(|| {
            let mut hits = 0;
            for index in (0..size).rev().step_by(1031) {
                hits += composite.find_component(black_box(index)).unwrap();
            }
            hits
        })
    });

    group.finish();
}

fn bench_handshake(c: &mut Criterion) {
    let mut group = c.benchmark_group("handshake");

    group.bench_function("compute_accept_key", |b| {
        b.iter(|| compute_accept_key(black_box("dGhlIHNhbXBsZSBub25jZQ==")))
    });

    group.finish();
}

fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassembly");
    let payload = vec![0xAB; 64 * 1024];

    for (name, fragment_size) in [("single_frame", 64 * 1024), ("16_fragments", 4096)] {
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut assembler = MessageAssembler::new(Limits::default());
                let mut message = None;
                for frame in Fragmenter::new(OpCode::Binary, payload.clone(), fragment_size) {
                    message = assembler.push(frame).unwrap();
                }
                message
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decode,
    bench_encode,
    bench_masking,
    bench_composite,
    bench_handshake,
    bench_reassembly
);
criterion_main!(benches);
