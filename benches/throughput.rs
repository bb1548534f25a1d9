//! Throughput Benchmark for stompsql
//!
//! Measures frame extraction, command parsing and dispatch against an
//! in-memory store.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use stompsql::commands::CommandHandler;
use stompsql::protocol::{Command, FrameReader};
use stompsql::storage::SqliteStore;

/// Benchmark frame extraction from coalesced and fragmented input
fn bench_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("frames");

    let batch: Vec<u8> = (0..100)
        .flat_map(|i| format!("ADD_FILE user{} file{}.json\0", i, i).into_bytes())
        .collect();
    group.throughput(Throughput::Bytes(batch.len() as u64));

    group.bench_function("coalesced_100", |b| {
        b.iter(|| {
            let mut reader = FrameReader::new();
            reader.feed(black_box(&batch));
            let mut count = 0;
            while let Some(frame) = reader.try_extract() {
                black_box(frame);
                count += 1;
            }
            assert_eq!(count, 100);
        });
    });

    group.bench_function("fragmented_16b", |b| {
        b.iter(|| {
            let mut reader = FrameReader::new();
            let mut count = 0;
            for chunk in batch.chunks(16) {
                reader.feed(black_box(chunk));
                while let Some(frame) = reader.try_extract() {
                    black_box(frame);
                    count += 1;
                }
            }
            assert_eq!(count, 100);
        });
    });

    group.bench_function("large_frame_64k", |b| {
        let mut large = vec![b'x'; 64 * 1024];
        large.push(0);
        b.iter(|| {
            let mut reader = FrameReader::new();
            for chunk in large.chunks(1024) {
                reader.feed(chunk);
                if let Some(frame) = reader.try_extract() {
                    black_box(frame);
                }
            }
        });
    });

    group.finish();
}

/// Benchmark command parsing
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(1));

    group.bench_function("login", |b| {
        b.iter(|| black_box(Command::parse(black_box("LOGIN alice secret"))));
    });

    group.bench_function("select", |b| {
        b.iter(|| {
            black_box(Command::parse(black_box(
                "SELECT username, login_time, logout_time FROM logins WHERE username = 'alice'",
            )))
        });
    });

    group.finish();
}

/// Benchmark dispatch against an in-memory store
fn bench_dispatch(c: &mut Criterion) {
    let store = Arc::new(SqliteStore::in_memory().expect("in-memory store"));
    let handler = CommandHandler::new(store);

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    group.bench_function("add_file", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let frame = format!("ADD_FILE user{} file{}.json", i % 100, i);
            black_box(handler.execute_frame(&frame));
            i += 1;
        });
    });

    group.bench_function("login_existing", |b| {
        handler.execute_frame("LOGIN bench pw");
        b.iter(|| black_box(handler.execute_frame("LOGIN bench pw")));
    });

    group.bench_function("select_users", |b| {
        for i in 0..100 {
            handler.execute_frame(&format!("LOGIN user{} pw", i));
        }
        b.iter(|| black_box(handler.execute_frame("SELECT username FROM users")));
    });

    group.bench_function("unknown", |b| {
        b.iter(|| black_box(handler.execute_frame("FOO bar")));
    });

    group.finish();
}

criterion_group!(benches, bench_frames, bench_parse, bench_dispatch);
criterion_main!(benches);
