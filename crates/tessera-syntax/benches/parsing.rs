use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tessera_syntax::Language;

const SCRIPT: &str = include_str!("../src/fixtures/script_program.tss");
const TEMPLATE: &str = include_str!("../src/fixtures/page.hbs");
const MAKEFILE: &str = include_str!("../src/fixtures/build.mk");

/// Repeat `unit` until the result is at least `size_kb` kilobytes.
fn scaled(unit: &str, size_kb: usize) -> String {
    let target = size_kb * 1024;
    let mut content = String::with_capacity(target + unit.len());
    while content.len() < target {
        content.push_str(unit);
        content.push('\n');
    }
    content
}

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");

    for (language, unit) in [
        (Language::Script, SCRIPT),
        (Language::Template, TEMPLATE),
        (Language::Makefile, MAKEFILE),
    ] {
        let content = scaled(unit, 100);
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(
            BenchmarkId::new(language.name(), "100kb"),
            &content,
            |b, content| b.iter(|| language.tokenize(black_box(content))),
        );
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for size_kb in [1, 10, 100] {
        for (language, unit) in [
            (Language::Script, SCRIPT),
            (Language::Template, TEMPLATE),
            (Language::Makefile, MAKEFILE),
        ] {
            let content = scaled(unit, size_kb);
            group.throughput(Throughput::Bytes(content.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(language.name(), size_kb),
                &content,
                |b, content| b.iter(|| language.parse(black_box(content))),
            );
        }
    }

    group.finish();
}

fn bench_error_recovery(c: &mut Criterion) {
    // Every line is broken in a different way
    let unit = "fn f(a { let x = 1 +\n@ class { fn }\nif (a b) } ] ) ;\n";
    let content = scaled(unit, 10);

    c.bench_function("parse_broken_script_10kb", |b| {
        b.iter(|| Language::Script.parse(black_box(&content)))
    });
}

criterion_group!(benches, bench_tokenize, bench_parse, bench_error_recovery);
criterion_main!(benches);
