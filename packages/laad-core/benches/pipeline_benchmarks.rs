//! Benchmarks for end-to-end compilation
//!
//! Run with: cargo bench --bench pipeline_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use laad_core::config::CompilerConfig;
use laad_core::{parse, Compiler};

/// `n` independent arithmetic chains, one inference component each
fn generate_components(n: usize) -> String {
    (0..n)
        .map(|i| format!("x{i} = {i} + {i} * 2\nx{i} -> display\n"))
        .collect()
}

/// One update event driving `n` conditionals and a range loop
fn generate_control_flow(n: usize) -> String {
    let mut source = String::from("c = true\n");
    for i in 0..n {
        source.push_str(&format!("v{i} = if c then {i} else {i}.5\nv{i} -> display\n"));
    }
    source.push_str("u = logix.events.update\nu -> for (i in 0..10) {\n  i -> logix.actions.log\n}\n");
    source
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for n in [10, 100, 1000] {
        let source = generate_components(n);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &source, |b, source| {
            b.iter(|| parse(black_box(source)))
        });
    }
    group.finish();
}

fn bench_compile_components(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_components");
    for n in [10, 100, 1000] {
        let source = generate_components(n);
        group.throughput(Throughput::Elements(n as u64));
        for parallel in [false, true] {
            let mut config = CompilerConfig::default();
            config.inference.parallel = parallel;
            let compiler = Compiler::new(config);
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, n), &source, |b, source| {
                b.iter(|| compiler.compile(black_box(source)))
            });
        }
    }
    group.finish();
}

fn bench_compile_control_flow(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_control_flow");
    let compiler = Compiler::default();
    for n in [10, 100] {
        let source = generate_control_flow(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &source, |b, source| {
            b.iter(|| compiler.compile(black_box(source)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_compile_components,
    bench_compile_control_flow
);
criterion_main!(benches);
