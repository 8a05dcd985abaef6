/*!
 * Bridge Throughput Benchmarks
 *
 * Compare direct-write and fill-from-source ingestion with a concurrent reader
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pipe_bridge::{BridgeConfig, CancellationToken, ReaderSource, StreamBridge};
use std::io::Cursor;
use std::thread;

const PAYLOAD: usize = 4 * 1024 * 1024;

fn drain(mut reader: pipe_bridge::BridgeReader, buf_size: usize) -> usize {
    let mut buf = vec![0u8; buf_size];
    let mut total = 0;
    loop {
        let n = reader.read(&mut buf);
        if n == 0 {
            return total;
        }
        total += black_box(n);
    }
}

fn bench_direct_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct_write");
    group.throughput(Throughput::Bytes(PAYLOAD as u64));

    for message_size in [64usize, 1024, 16 * 1024] {
        let message = vec![0xABu8; message_size];
        group.bench_with_input(
            BenchmarkId::from_parameter(message_size),
            &message,
            |b, message| {
                b.iter(|| {
                    let (mut writer, reader) = StreamBridge::new().split();
                    let consumer = thread::spawn(move || drain(reader, 4096));
                    for _ in 0..PAYLOAD / message.len() {
                        writer.write(message).unwrap();
                    }
                    writer.signal_completion();
                    consumer.join().unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_fill_from_source(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_from_source");
    group.throughput(Throughput::Bytes(PAYLOAD as u64));
    let data = vec![0x5Au8; PAYLOAD];

    for chunk_size in [1024usize, 8 * 1024, 64 * 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let config = BridgeConfig::default().with_chunk_size(chunk_size);
                    let (writer, reader) = StreamBridge::with_config(config).unwrap().split();
                    let source = ReaderSource::new(Cursor::new(data.clone()));
                    let fill = writer
                        .spawn_fill_loop(source, CancellationToken::new())
                        .unwrap();
                    let read = drain(reader, 4096);
                    fill.join().unwrap();
                    read
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_direct_write, bench_fill_from_source);
criterion_main!(benches);
