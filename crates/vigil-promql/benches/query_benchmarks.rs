//! Benchmarks for vigil-promql.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vigil_promql::{
    BinaryOperator, BinaryQuery, LabelFilter, LabelOperator, Operation, QueryModeller,
    VectorMatching, VisualQuery,
};

fn dashboard_query() -> VisualQuery {
    let requests = VisualQuery::new("http_requests_total")
        .with_label(LabelFilter::equal("job", "api"))
        .with_operation(Operation::new("rate").with_param("$__rate_interval"))
        .with_operation(Operation::new("sum_by").with_param("service"));

    VisualQuery::new("http_requests_total")
        .with_label(LabelFilter::equal("job", "api"))
        .with_label(LabelFilter::new("code", LabelOperator::RegexMatch, "5.."))
        .with_operation(Operation::new("rate").with_param("$__rate_interval"))
        .with_operation(Operation::new("sum_by").with_param("service"))
        .with_binary_query(
            BinaryQuery::new(BinaryOperator::Divide, requests)
                .with_vector_matching(VectorMatching::on(["service"])),
        )
}

fn benchmark_render(c: &mut Criterion) {
    let modeller = QueryModeller::default();
    let query = dashboard_query();

    c.bench_function("render_error_ratio", |b| {
        b.iter(|| modeller.render(black_box(&query)));
    });
}

fn benchmark_parse(c: &mut Criterion) {
    let modeller = QueryModeller::default();
    let text = modeller.render(&dashboard_query());

    c.bench_function("parse_error_ratio", |b| {
        b.iter(|| modeller.parse(black_box(&text)));
    });
}

fn benchmark_parse_raw_fallback(c: &mut Criterion) {
    let modeller = QueryModeller::default();
    let text = "sum(rate(http_requests_total[5m] offset 1h)) by (service)";

    c.bench_function("parse_raw_fallback", |b| {
        b.iter(|| modeller.parse(black_box(text)));
    });
}

fn benchmark_normalize(c: &mut Criterion) {
    let modeller = QueryModeller::default();
    let value = serde_json::to_value(dashboard_query()).unwrap_or_default();

    c.bench_function("normalize_error_ratio", |b| {
        b.iter(|| modeller.normalize(black_box(&value)));
    });
}

criterion_group!(
    benches,
    benchmark_render,
    benchmark_parse,
    benchmark_parse_raw_fallback,
    benchmark_normalize,
);
criterion_main!(benches);
