//! Benchmarks for parsing, binary decoding and template rendering.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ogdl_core::{parse_template, process, Graph};

/// A synthetic configuration-style document.
fn sample_doc(sections: usize) -> String {
    let mut out = String::new();
    for s in 0..sections {
        out.push_str(&format!("section{s}\n"));
        for k in 0..8 {
            out.push_str(&format!("  key{k} value{k}\n"));
            out.push_str(&format!("    meta{k} \"quoted value {k}\"\n"));
        }
    }
    out
}

fn bench_parse(c: &mut Criterion) {
    let input = sample_doc(64);

    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("config_doc", |b| {
        b.iter(|| Graph::parse(black_box(&input)).unwrap())
    });

    let flat = "a b c, d e, f\n".repeat(256);
    group.throughput(Throughput::Bytes(flat.len() as u64));
    group.bench_function("sequences", |b| {
        b.iter(|| Graph::parse(black_box(&flat)).unwrap())
    });
    group.finish();
}

fn bench_binary(c: &mut Criterion) {
    let g = Graph::parse(&sample_doc(64)).unwrap();
    let bytes = g.to_binary().unwrap();

    let mut group = c.benchmark_group("binary");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("encode", |b| b.iter(|| black_box(&g).to_binary().unwrap()));
    group.bench_function("decode", |b| {
        b.iter(|| Graph::from_binary(black_box(&bytes)).unwrap())
    });
    group.finish();
}

fn bench_template(c: &mut Criterion) {
    let template =
        parse_template("$for(u, users)name=$u id=$(n = n + 1)$n\n$end").unwrap();
    let mut ctx = Graph::parse("n 0\nusers\n").unwrap();
    if let Some(users) = ctx.node_mut("users") {
        for i in 0..64 {
            users.add(format!("user{i}").as_str());
        }
    }

    c.bench_function("template_render", |b| {
        b.iter(|| process(black_box(&template), &mut ctx))
    });
}

criterion_group!(benches, bench_parse, bench_binary, bench_template);
criterion_main!(benches);
