//! Benchmarks for the layout optimizer.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use layoutopt::analysis::CostModel;
use layoutopt::autotuning::{LayoutSearch, SearchConfig};

const GEMM: &str = r#"
    func a(x, y) in [0, 1023], [0, 63] = x + y;
    func b(x, y) in [0, 63], [0, 1023] = x - y;
    func out(i, j) in [0, 1023], [0, 1023] = 0;
    update out reduce k in [0, 63] order i, k, j = out(i, j) + a(i, k) * b(k, j);
    output out;
"#;

const BLUR: &str = r#"
    func input(x, y) in [0, 2047], [0, 1023] = x + y;
    func blur_x(x, y) in [0, 2045], [0, 1023] order y, x =
        input(x, y) + input(x + 1, y) + input(x + 2, y);
    func blur_y(x, y) in [0, 2045], [0, 1021] =
        blur_x(x, y) + blur_x(x, y + 1) + blur_x(x, y + 2);
    output blur_y;
"#;

/// Benchmark lexing and parsing.
fn bench_parsing(c: &mut Criterion) {
    c.bench_function("parse_gemm", |b| {
        b.iter(|| {
            let lexer = layoutopt::frontend::Lexer::new(black_box(GEMM));
            let mut parser = layoutopt::frontend::Parser::new(lexer).unwrap();
            parser.parse_program().unwrap()
        })
    });
}

/// Benchmark scoring a pipeline snapshot.
fn bench_cost_model(c: &mut Criterion) {
    let pipeline = layoutopt::parse_pipeline(BLUR).unwrap();
    let model = CostModel::new();
    c.bench_function("layout_cost_blur", |b| {
        b.iter(|| model.layout_cost(black_box(&pipeline)))
    });
}

/// Benchmark a full greedy search.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    for (name, source) in [("gemm", GEMM), ("blur", BLUR)] {
        let pipeline = layoutopt::parse_pipeline(source).unwrap();
        let search = LayoutSearch::new(SearchConfig::default());
        group.bench_function(name, |b| b.iter(|| search.run(black_box(&pipeline))));
    }
    group.finish();
}

criterion_group!(benches, bench_parsing, bench_cost_model, bench_search);
criterion_main!(benches);
