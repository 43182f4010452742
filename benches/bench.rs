use std::hint::black_box;

use bytes::BytesMut;
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};

use crate::{
    consts::{
        COMMENT_LINE, CRLF_LINE, DATA_LINE, EMPTY_LINE, EVENT_LINE, ID_LINE, NO_SPACE_LINE,
        RETRY_LINE, UNKNOWN_LINE, big_data_line, generate_completion_stream, generate_mixed_stream,
        generate_one_of_each,
    },
    event_stream::{load_chunks, load_line_aligned_chunks, run_event_stream},
};

pub(crate) mod consts;

/// Single-line split and classify
fn bench_parse_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_line");

    let big = big_data_line(1024);
    let lines: &[(&str, &[u8])] = &[
        ("data_field", DATA_LINE),
        ("comment", COMMENT_LINE),
        ("event_field", EVENT_LINE),
        ("id_field", ID_LINE),
        ("retry_field", RETRY_LINE),
        ("empty_line", EMPTY_LINE),
        ("no_space", NO_SPACE_LINE),
        ("crlf", CRLF_LINE),
        ("unknown", UNKNOWN_LINE),
        ("big_data_line", &big[..]),
    ];

    for &(name, line) in lines {
        group.bench_with_input(BenchmarkId::new("sseload", name), line, |b, input| {
            b.iter_batched(
                || BytesMut::from(input),
                |mut buffer| {
                    let _ = black_box(sseload::parser::parse_line_from_buffer(&mut buffer));
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_event_stream(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let completion = generate_completion_stream(512);
    let mixed = generate_mixed_stream(512);
    let evenish = generate_one_of_each(128);

    let mut group = c.benchmark_group("event_stream");

    for (name, raw) in [
        ("completion", &completion),
        ("mixed", &mixed),
        ("evenish_distribution", &evenish),
    ] {
        for (alignment, chunks) in [
            ("unaligned", load_chunks(raw)),
            ("line-aligned", load_line_aligned_chunks(raw)),
        ] {
            let id = format!("{name}_{alignment}");
            group.bench_with_input(BenchmarkId::new("sseload", &id), &chunks, |b, chunks| {
                b.iter(|| run_event_stream(&rt, chunks));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_parse_line, bench_event_stream);
criterion_main!(benches);
