mod common;

use std::fs;
use std::sync::Arc;

use kmersearch::{
    ClusterError, Pipeline, PipelineError, Stage, StageAction, StageStatus,
};
use tempfile::tempdir;

use common::{RecordingMetrics, exact_config, families_db};

fn ran() -> Pipeline {
    let mut pipeline = Pipeline::new(exact_config()).unwrap();
    pipeline.set_database(families_db()).unwrap();
    pipeline.run_all().unwrap();
    pipeline
}

#[test]
fn invalid_config_is_rejected_before_any_work() {
    let mut config = exact_config();
    config.cluster.coverage = 0.0;
    let err = Pipeline::new(config).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(ref msg) if msg.contains("coverage")));

    let mut config = exact_config();
    config.version = "9".to_string();
    assert!(matches!(
        Pipeline::new(config),
        Err(PipelineError::Configuration(_))
    ));
}

#[test]
fn missing_upstream_stage_is_reported() {
    let mut pipeline = Pipeline::new(exact_config()).unwrap();
    pipeline.set_database(families_db()).unwrap();
    let err = pipeline.run_vocabulary().unwrap_err();
    assert!(matches!(err, PipelineError::Stage { stage: Stage::Clustering, .. }));
    assert!(matches!(pipeline.status(Stage::Vocabulary), StageStatus::Failed(_)));
    assert!(pipeline.status(Stage::Database).is_ready());
}

#[test]
fn kmer_length_mismatch_keeps_prior_clustering() {
    let dir = tempdir().unwrap();
    let saved = dir.path().join("prototypes.json");
    ran().save_clustering(&saved).unwrap();

    let mut config = exact_config();
    config.cluster.kmer_length = 5;
    let mut pipeline = Pipeline::new(config).unwrap();
    pipeline.set_database(families_db()).unwrap();
    pipeline.run_partition().unwrap();
    let before = pipeline.run_clustering().unwrap().prototypes.clone();
    pipeline.run_vocabulary().unwrap();

    let err = pipeline.load_clustering(&saved).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::LoadMismatch { field: "kmer_length", ref expected, ref found, .. }
            if expected == "5" && found == "4"
    ));
    assert_eq!(pipeline.clustering().unwrap().prototypes, before);
    assert!(pipeline.vocabulary().is_some(), "failed load must not invalidate downstream");
    assert!(matches!(pipeline.status(Stage::Clustering), StageStatus::Failed(_)));
}

#[test]
fn out_of_range_signature_batch_is_discarded() {
    let dir = tempdir().unwrap();
    let saved = dir.path().join("signatures.json");
    let mut pipeline = ran();
    pipeline.save_signatures(&saved).unwrap();
    let before = pipeline.signatures().unwrap().to_vec();

    let mut doc: serde_json::Value = serde_json::from_slice(&fs::read(&saved).unwrap()).unwrap();
    let vocabulary_size = doc["vocabulary_size"].as_u64().unwrap();
    let ids = doc["signatures"][0]["ids"].as_array_mut().unwrap();
    ids.push(serde_json::Value::from(vocabulary_size + 7));
    fs::write(&saved, serde_json::to_vec(&doc).unwrap()).unwrap();

    let err = pipeline.load_signatures(&saved).unwrap_err();
    assert!(matches!(err, PipelineError::OutOfRange { artifact: "signatures", .. }));
    assert_eq!(pipeline.signatures().unwrap(), before.as_slice());
    assert!(pipeline.rankings().is_some());
}

#[test]
fn signatures_from_a_larger_vocabulary_are_out_of_range() {
    let dir = tempdir().unwrap();
    let saved = dir.path().join("signatures.json");
    let wide = ran();
    assert!(wide.vocabulary().unwrap().len() > 3);
    wide.save_signatures(&saved).unwrap();

    let mut config = exact_config();
    config.vocabulary.size = 3;
    let mut narrow = Pipeline::new(config).unwrap();
    narrow.set_database(families_db()).unwrap();
    narrow.run_all().unwrap();
    let before = narrow.signatures().unwrap().to_vec();

    let err = narrow.load_signatures(&saved).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::OutOfRange { artifact: "signatures", feature, vocabulary_size: 3, .. }
            if feature >= 3
    ));
    assert_eq!(narrow.signatures().unwrap(), before.as_slice());
    assert!(narrow.rankings().is_some());
    assert!(matches!(narrow.status(Stage::Signatures), StageStatus::Failed(_)));
}

#[test]
fn matrix_mismatch_is_reported() {
    let dir = tempdir().unwrap();
    let saved = dir.path().join("prototypes.bin");
    ran().save_clustering(&saved).unwrap();

    let mut config = exact_config();
    config.matrix.mismatch_cost = 3;
    let mut pipeline = Pipeline::new(config).unwrap();
    pipeline.set_database(families_db()).unwrap();
    let err = pipeline.load_clustering(&saved).unwrap_err();
    assert!(matches!(err, PipelineError::LoadMismatch { field: "matrix", .. }));
    assert!(pipeline.clustering().is_none());
}

#[test]
fn io_and_decode_failures_update_status_and_metrics() {
    let dir = tempdir().unwrap();
    let recorder = Arc::new(RecordingMetrics::default());
    let mut pipeline = Pipeline::new(exact_config()).unwrap().with_metrics(recorder.clone());
    pipeline.set_database(families_db()).unwrap();

    let err = pipeline.load_rankings(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, PipelineError::Io { .. }));

    let garbage = dir.path().join("rankings.bin");
    fs::write(&garbage, b"definitely not zstd").unwrap();
    let err = pipeline.load_rankings(&garbage).unwrap_err();
    assert!(matches!(err, PipelineError::Decode { artifact: "rankings", .. }));
    assert!(matches!(pipeline.status(Stage::Ranking), StageStatus::Failed(_)));

    let events = recorder.events();
    assert_eq!(
        &events[1..],
        &[
            (Stage::Ranking, StageAction::Load, false),
            (Stage::Ranking, StageAction::Load, false),
        ]
    );
}

#[test]
fn stage_errors_are_wrapped_unchanged() {
    let err: PipelineError = ClusterError::InvalidConfigK { k: 0 }.into();
    assert!(matches!(err, PipelineError::Cluster(ClusterError::InvalidConfigK { k: 0 })));
    assert!(err.to_string().contains("kmer_length must be >= 1"));
}
