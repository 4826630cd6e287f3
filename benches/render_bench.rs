use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rfmarkup::escape::escape_text;
use rfmarkup::{render_fragment, ClassNaming, Document, Node, RenderConfig, StyleEntry};

fn table(rows: usize) -> Node {
    let rows = (0..rows).map(|i| {
        let shade = if i % 2 == 0 { "#333" } else { "#666" };
        let number = Node::element("td", i.to_string()).style(StyleEntry::new("padding", "4px"));
        let name = Node::element("td", format!("name <{}> & co", i));
        let icon = Node::element("td", Node::void("img").attribute("src", "/i.png"));
        let cells = (
            number,
            name.style(StyleEntry::new("color", shade)),
            icon.style(StyleEntry::new("opacity", "0.5").hover()),
        );
        Node::element("tr", cells)
    });
    Node::element("table", Node::array(rows))
}

fn bench_escape(c: &mut Criterion) {
    let clean = "the quick brown fox jumps over the lazy dog ".repeat(64);
    let dirty = "a < b && c > d ".repeat(64);
    let mut group = c.benchmark_group("escape_text");
    for (name, input) in [("clean", &clean), ("dirty", &dirty)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            let mut out = Vec::with_capacity(input.len() * 2);
            b.iter(|| {
                out.clear();
                escape_text(black_box(input.as_bytes()), &mut out);
            })
        });
    }
    group.finish();
}

fn bench_fragment(c: &mut Criterion) {
    let node = table(500);
    let mut group = c.benchmark_group("render_fragment");
    for naming in [ClassNaming::Sequential, ClassNaming::ContentHash] {
        let config = RenderConfig {
            class_naming: naming,
            reserved_capacity: 64 * 1024,
            ..Default::default()
        };
        group.bench_function(format!("{:?}", naming), |b| {
            b.iter(|| render_fragment(black_box(&node), &config))
        });
    }
    group.finish();
}

fn bench_document(c: &mut Criterion) {
    let doc = Document::new(Node::element("title", "bench"), table(500));
    let config = RenderConfig::pretty();
    c.bench_function("document_pretty", |b| {
        b.iter(|| doc.render(black_box(&config)))
    });
    c.bench_function("document_chunked", |b| {
        b.iter(|| {
            let mut total = 0usize;
            doc.render_chunked(&config, |chunk| total += chunk.len());
            total
        })
    });
}

criterion_group!(benches, bench_escape, bench_fragment, bench_document);
criterion_main!(benches);
