mod common;

use kmersearch::{ArtifactFormat, Pipeline, Stage, StageStatus};
use tempfile::tempdir;

use common::{exact_config, families_db};

fn roundtrip(format: ArtifactFormat) {
    let dir = tempdir().unwrap();
    let mut config = exact_config();
    config.output.format = format;

    let mut original = Pipeline::new(config.clone()).unwrap();
    original.set_database(families_db()).unwrap();
    original.run_all().unwrap();
    let written = original.save_all(dir.path()).unwrap();
    let ext = format.extension();
    assert!(written.iter().all(|p| p.extension().unwrap() == ext));

    let mut restored = Pipeline::new(config).unwrap();
    restored.set_database(families_db()).unwrap();
    restored
        .load_clustering(dir.path().join(format!("prototypes.{ext}")))
        .unwrap();
    restored
        .load_vocabulary(dir.path().join(format!("vocabulary.{ext}")))
        .unwrap();
    restored
        .load_signatures(dir.path().join(format!("signatures.{ext}")))
        .unwrap();
    restored
        .load_rankings(dir.path().join(format!("rankings.{ext}")))
        .unwrap();
    restored.run_evaluation().unwrap();

    let (a, b) = (original.clustering().unwrap(), restored.clustering().unwrap());
    assert_eq!(a.prototypes, b.prototypes);
    assert_eq!(a.members, b.members);
    assert_eq!(a.kmer_length, b.kmer_length);
    assert_eq!(a.threshold, b.threshold);
    assert_eq!(original.vocabulary(), restored.vocabulary());
    assert_eq!(original.signatures(), restored.signatures());
    assert_eq!(original.rankings(), restored.rankings());
    assert_eq!(original.evaluation(), restored.evaluation());
    assert!(restored.status(Stage::Ranking).is_ready());
}

#[test]
fn json_artifacts_roundtrip() {
    roundtrip(ArtifactFormat::Json);
}

#[test]
fn binary_artifacts_roundtrip() {
    roundtrip(ArtifactFormat::Binary);
}

#[test]
fn loading_a_stage_invalidates_downstream() {
    let dir = tempdir().unwrap();
    let mut pipeline = Pipeline::new(exact_config()).unwrap();
    pipeline.set_database(families_db()).unwrap();
    pipeline.run_all().unwrap();
    let saved = dir.path().join("vocabulary.json");
    pipeline.save_vocabulary(&saved).unwrap();

    pipeline.load_vocabulary(&saved).unwrap();
    assert!(pipeline.clustering().is_some());
    assert!(pipeline.signatures().is_none());
    assert!(pipeline.postings().is_none());
    assert_eq!(pipeline.status(Stage::Evaluation), &StageStatus::NotReady);

    pipeline.run_signatures().unwrap();
    pipeline.run_index().unwrap();
    pipeline.run_ranking().unwrap();
    assert!(pipeline.run_evaluation().unwrap().map > 0.0);
}

#[test]
fn saving_an_absent_stage_fails_without_side_effects() {
    let dir = tempdir().unwrap();
    let mut pipeline = Pipeline::new(exact_config()).unwrap();
    pipeline.set_database(families_db()).unwrap();
    assert!(pipeline.save_signatures(dir.path().join("s.json")).is_err());
    assert_eq!(pipeline.status(Stage::Signatures), &StageStatus::NotReady);
    assert!(!dir.path().join("s.json").exists());
}
