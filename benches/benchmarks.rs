//! Performance benchmarks for report parsing
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

use certsuite_qe::report::{claim, junit};
use certsuite_qe::suites::networking::find_list_intersections;

fn junit_report(test_cases: usize) -> String {
    let cases: String = (0..test_cases)
        .map(|i| match i % 3 {
            0 => format!(r#"<testcase name="tc-{i}" status="passed" time="0.1"></testcase>"#),
            1 => format!(
                r#"<testcase name="tc-{i}" status="failed" time="0.1"><failure message="non compliant">details</failure></testcase>"#
            ),
            _ => format!(
                r#"<testcase name="tc-{i}" status="skipped" time="0"><skipped message="no pods"></skipped></testcase>"#
            ),
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><testsuites><testsuite name="CNF Certification Test Suite">{}</testsuite></testsuites>"#,
        cases
    )
}

fn claim_report(test_cases: usize) -> String {
    let results: serde_json::Map<String, serde_json::Value> = (0..test_cases)
        .map(|i| {
            let details = json!({
                "CompliantObjectsOut": [{
                    "ObjectType": "Pod",
                    "ObjectFieldsKeys": ["Reason", "Namespace", "PodName"],
                    "ObjectFieldsValues": ["ok", "ns", format!("pod-{}", i)]
                }],
                "NonCompliantObjectsOut": []
            });
            (
                format!("tc-{}", i),
                json!({ "state": "passed", "skipReason": "", "checkDetails": details.to_string() }),
            )
        })
        .collect();

    json!({ "claim": { "results": results } }).to_string()
}

fn bench_junit_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("junit_parsing");

    for count in [10, 100, 500].iter() {
        let xml = junit_report(*count);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("parse", count), &xml, |b, xml| {
            b.iter(|| junit::parse_str(black_box(xml)).unwrap())
        });

        let report = junit::parse_str(&xml).unwrap();
        let last = format!("tc-{}", count - 1);
        group.bench_with_input(BenchmarkId::new("lookup_last", count), &report, |b, report| {
            b.iter(|| junit::test_case_status(black_box(report), black_box(&last)).unwrap())
        });
    }

    group.finish();
}

fn bench_claim_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim_parsing");

    for count in [10, 100, 500].iter() {
        let raw = claim_report(*count);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("parse", count), &raw, |b, raw| {
            b.iter(|| claim::parse_str(black_box(raw)).unwrap())
        });

        let parsed = claim::parse_str(&raw).unwrap();
        group.bench_with_input(BenchmarkId::new("check_details", count), &parsed, |b, parsed| {
            b.iter(|| claim::check_details(black_box(parsed), "tc-0").unwrap())
        });
    }

    group.finish();
}

fn bench_list_intersections(c: &mut Criterion) {
    let lists: Vec<Vec<String>> = (0..8)
        .map(|node| (node..node + 64).map(|i| format!("ens{}f0", i)).collect())
        .collect();

    c.bench_function("find_list_intersections_8x64", |b| {
        b.iter(|| find_list_intersections(black_box(&lists)))
    });
}

criterion_group!(
    benches,
    bench_junit_parsing,
    bench_claim_parsing,
    bench_list_intersections
);
criterion_main!(benches);
