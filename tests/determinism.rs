mod common;

use kmersearch::{EngineConfig, Pipeline, VocabularyPolicy};

use common::{exact_config, families_db};

fn run(config: EngineConfig) -> Pipeline {
    let mut pipeline = Pipeline::new(config).expect("valid config");
    pipeline.set_database(families_db()).expect("dna fixture");
    pipeline.run_all().expect("pipeline runs");
    pipeline
}

#[test]
fn identical_configs_produce_identical_results() {
    let mut config = exact_config();
    config.cluster.threshold = 1;
    config.cluster.coverage = 90.0;
    config.vocabulary.size = 12;
    config.vocabulary.policy = VocabularyPolicy::MinHash;

    let a = run(config.clone());
    let b = run(config);

    assert_eq!(a.clustering().unwrap().prototypes, b.clustering().unwrap().prototypes);
    assert_eq!(a.vocabulary(), b.vocabulary());
    assert_eq!(a.signatures(), b.signatures());
    assert_eq!(a.rankings(), b.rankings());
    assert_eq!(a.evaluation(), b.evaluation());
}

#[test]
fn sampling_policies_depend_only_on_seed() {
    for policy in [VocabularyPolicy::Uniform, VocabularyPolicy::MinHash] {
        let mut config = exact_config();
        config.vocabulary.size = 5;
        config.vocabulary.policy = policy;
        config.vocabulary.seed = 99;

        let first = run(config.clone());
        let second = run(config.clone());
        assert_eq!(first.vocabulary(), second.vocabulary(), "{policy:?}");
        assert_eq!(first.vocabulary().unwrap().len(), 5);
    }
}

#[test]
fn first_n_vocabulary_is_the_largest_prototypes() {
    let mut config = exact_config();
    config.vocabulary.size = 3;
    let pipeline = run(config);

    let clustering = pipeline.clustering().unwrap();
    let vocabulary = pipeline.vocabulary().unwrap();
    assert_eq!(vocabulary.prototypes(), &clustering.prototypes[..3]);
    for signature in pipeline.signatures().unwrap() {
        assert!(signature.max_id().is_none_or(|id| id < 3));
    }
}

#[test]
fn worker_pool_size_does_not_change_rankings() {
    let mut pooled = exact_config();
    pooled.threads = 3;
    let a = run(exact_config());
    let b = run(pooled);
    assert_eq!(a.signatures(), b.signatures());
    assert_eq!(a.rankings(), b.rankings());
}
