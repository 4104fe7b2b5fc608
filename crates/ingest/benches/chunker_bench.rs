//! Benchmarks for markdown chunking operations
//!
//! Run with: cargo bench -p amelia-ingest --bench chunker_bench

use amelia_ingest::{ChunkerConfig, chunk_markdown};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

fn generate_markdown(sections: usize) -> String {
  let mut doc = String::new();
  doc.push_str("# Document Title\n\n");
  for i in 0..sections {
    doc.push_str(&format!("## Section {i}\n\n"));
    doc.push_str(&"This is a paragraph of representative prose content. ".repeat(20));
    doc.push_str("\n\n");
    doc.push_str(&format!("### Subsection {i}.1\n\n"));
    doc.push_str(&"More detailed body text goes here for benchmarking purposes. ".repeat(15));
    doc.push_str("\n\n");
  }
  doc
}

fn bench_chunk_markdown(c: &mut Criterion) {
  let mut group = c.benchmark_group("chunk_markdown");
  let config = ChunkerConfig::default();

  for sections in [5, 20, 50, 100].iter() {
    let doc = generate_markdown(*sections);
    group.throughput(Throughput::Bytes(doc.len() as u64));
    group.bench_with_input(BenchmarkId::from_parameter(sections), &doc, |b, doc| {
      b.iter(|| chunk_markdown(black_box(doc), black_box(&config)));
    });
  }

  group.finish();
}

fn bench_chunk_markdown_no_headings(c: &mut Criterion) {
  let mut group = c.benchmark_group("chunk_markdown_semantic_fallback");
  let config = ChunkerConfig::default();

  let prose = "Sentence number one. Sentence number two. Sentence number three. ".repeat(200);
  group.throughput(Throughput::Bytes(prose.len() as u64));
  group.bench_function("flat_prose", |b| {
    b.iter(|| chunk_markdown(black_box(&prose), black_box(&config)));
  });

  group.finish();
}

criterion_group!(benches, bench_chunk_markdown, bench_chunk_markdown_no_headings);
criterion_main!(benches);
