mod common;

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use kmersearch::{EngineConfig, Pipeline, ScoringPolicy};

use common::family_db;

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.cluster.kmer_length = 8;
    config.cluster.threshold = 1;
    config.cluster.coverage = 90.0;
    config.vocabulary.size = 512;
    config.signature.threshold = 1;
    config.rank.max_matches = 20;
    config
}

fn clustering_bench(c: &mut Criterion) {
    let mut pipeline = Pipeline::new(config()).expect("valid config");
    pipeline.set_database(family_db(20, 10, 200)).expect("dna db");
    pipeline.run_partition().expect("partition");

    let mut group = c.benchmark_group("clustering");
    group.sample_size(10);
    group.bench_function("200_sequences_k8_t1", |b| {
        b.iter(|| {
            let clustering = pipeline.run_clustering().expect("clustering");
            black_box(clustering.len());
        });
    });
    group.finish();
}

fn ranking_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");
    group.sample_size(20);
    for policy in [ScoringPolicy::Jaccard, ScoringPolicy::Cosine, ScoringPolicy::NegatedDot] {
        let mut cfg = config();
        cfg.rank.policy = policy;
        let mut pipeline = Pipeline::new(cfg).expect("valid config");
        pipeline.set_database(family_db(20, 10, 200)).expect("dna db");
        pipeline.run_all().expect("pipeline");

        group.bench_function(format!("{policy:?}"), |b| {
            b.iter(|| {
                let rankings = pipeline.run_ranking().expect("ranking");
                black_box(rankings.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, clustering_bench, ranking_bench);
criterion_main!(benches);
