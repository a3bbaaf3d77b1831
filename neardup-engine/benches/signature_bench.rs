//! Signature and pipeline benchmarks.
//!
//! Run with: cargo bench -p neardup-engine --bench signature_bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use neardup_core::config::NeardupConfig;
use neardup_core::types::Document;
use neardup_engine::{DedupPipeline, MinHasher, Shingler};
use neardup_storage::MemoryStore;

/// Deterministic pseudo-text: `words` tokens drawn from a small vocabulary.
fn make_text(seed: usize, words: usize) -> String {
    let mut state = seed as u64 ^ 0x9E37_79B9_7F4A_7C15;
    (0..words)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            format!("w{}", (state >> 33) % 5000)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn shingle_and_sign(c: &mut Criterion) {
    let mut group = c.benchmark_group("signature");
    let shingler = Shingler::new(3, 0);

    for words in [100, 1000, 10000] {
        let text = make_text(words, words);
        group.bench_with_input(BenchmarkId::new("shingle", words), &text, |b, text| {
            b.iter(|| shingler.shingle(text));
        });

        let shingles = shingler.shingle(&text);
        for num_perm in [128, 256] {
            let hasher = MinHasher::new(num_perm, 1);
            group.bench_with_input(
                BenchmarkId::new(format!("minhash_k{num_perm}"), words),
                &shingles,
                |b, shingles| {
                    b.iter(|| hasher.signature(shingles));
                },
            );
        }
    }
    group.finish();
}

fn build_in_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_build");
    group.sample_size(10);

    let mut config = NeardupConfig::default();
    config.pipeline.workers = Some(4);
    let pipeline = DedupPipeline::from_config(&config).unwrap();

    for size in [1000, 5000] {
        // every tenth document is a copy of its predecessor
        let docs: Vec<Document> = (0..size)
            .map(|i| {
                let source = if i % 10 == 9 { i - 1 } else { i };
                Document::new(format!("doc-{i}"), make_text(source, 200))
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("memory_store", size), &docs, |b, docs| {
            b.iter(|| {
                let store = MemoryStore::new();
                pipeline
                    .build(&store, docs.iter().cloned().map(Ok))
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, shingle_and_sign, build_in_memory);
criterion_main!(benches);
