extern crate criterion;

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use stylecut_lib::parser::html::create_dom_tree;
use stylecut_lib::{CriticalCssExtractor, ExtractorConfig, NoopMetrics};

fn large_page() -> String {
    let mut html = String::with_capacity(4_000_000);
    html.push_str("<html><body><header class=\"site-header\"><nav class=\"menu\"></nav></header><main>");
    for i in 0..50_000 {
        html.push_str(&format!("<p class=\"item item-{}\">Test</p>", i % 500));
    }
    html.push_str("</main></body></html>");
    html
}

fn large_stylesheet() -> String {
    let mut css = String::from("body { margin: 0 } .site-header { display: flex }\n");
    for i in 0..5_000 {
        css.push_str(&format!(".item-{i} {{ padding: {}px }}\n", i % 40));
        if i % 100 == 0 {
            css.push_str(&format!("@media (max-width: {}px) {{ .item-{i} {{ margin: 0 }} }}\n", 600 + i));
        }
    }
    css
}

fn bench_large_document(c: &mut Criterion) {
    let html = large_page();
    c.bench_function("large_document", |b| b.iter(|| create_dom_tree(&html)));
}

fn bench_extraction(c: &mut Criterion) {
    let html = large_page();
    let css = large_stylesheet();
    let extractor = CriticalCssExtractor::new(ExtractorConfig::default(), Arc::new(NoopMetrics));
    c.bench_function("critical_extraction", |b| b.iter(|| extractor.extract(&html, &css)));
}

criterion_group!(benches, bench_large_document, bench_extraction);
criterion_main!(benches);
