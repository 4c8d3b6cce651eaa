//! Message and value encoding/decoding benchmarks.

use amfwire_core::{AsObject, Value};
use amfwire_protocol::{Body, Decoder, Encoder, Message, ObjectEncoding};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// An array of `count` records sharing one key set, so traits and strings
/// are referenced after the first record.
fn create_records(count: usize) -> Value {
    let items = (0..count)
        .map(|i| {
            let mut record = AsObject::typed("bench.Record");
            record.insert("id", i as i32);
            record.insert("name", format!("record-{}", i % 16));
            record.insert("score", i as f64 * 0.5);
            record.insert("active", i % 2 == 0);
            Value::object(record)
        })
        .collect();
    Value::array(items)
}

fn create_message(count: usize) -> Message {
    let mut message = Message::new(ObjectEncoding::Amf3);
    message.add_body(Body::new("/1/onResult", "null", create_records(count)));
    message
}

fn bench_value_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_encode");
    let encoder = Encoder::new();

    for count in [10, 100, 1000] {
        let value = create_records(count);

        group.throughput(Throughput::Elements(count as u64));
        for encoding in [ObjectEncoding::Amf0, ObjectEncoding::Amf3] {
            group.bench_with_input(
                BenchmarkId::new(encoding.to_string(), count),
                &value,
                |b, value| {
                    b.iter(|| black_box(encoder.encode_value(encoding, value).unwrap()));
                },
            );
        }
    }

    group.finish();
}

fn bench_value_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_decode");
    let encoder = Encoder::new();
    let decoder = Decoder::new();

    for count in [10, 100, 1000] {
        let value = create_records(count);

        group.throughput(Throughput::Elements(count as u64));
        for encoding in [ObjectEncoding::Amf0, ObjectEncoding::Amf3] {
            let encoded = encoder.encode_value(encoding, &value).unwrap();
            group.bench_with_input(
                BenchmarkId::new(encoding.to_string(), count),
                &encoded,
                |b, encoded| {
                    b.iter(|| black_box(decoder.decode_value(encoding, encoded.clone()).unwrap()));
                },
            );
        }
    }

    group.finish();
}

fn bench_message_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_roundtrip");
    let encoder = Encoder::new();

    for count in [10, 100, 1000] {
        let message = create_message(count);
        let encoded = encoder.encode(&message).unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &message, |b, message| {
            b.iter(|| {
                let bytes = encoder.encode(message).unwrap();
                let mut decoder = Decoder::new();
                black_box(decoder.decode(bytes).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_value_encode,
    bench_value_decode,
    bench_message_roundtrip
);
criterion_main!(benches);
