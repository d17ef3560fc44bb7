//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use kmersearch::{
    Alphabet, EngineConfig, FieldLayout, PipelineError, PipelineMetrics, SequenceDatabase, Stage,
    StageAction,
};

/// Two labelled families, one sequence carrying both labels and one
/// unlabelled sequence sharing no 4-mer with the rest.
pub const FAMILIES_FASTA: &str = "\
>fam1_a|fam1
acgtacgtggccaatt
>fam1_b|fam1
acgtacgtggccaatg
>fam1_c|fam1
acgtacctggccaatt
>fam2_a|fam2
ttttgggcccaaatat
>fam2_b|fam2
ttttgggcccaaatag
>fam2_c|fam2
tttagggcccaaatat
>mixed|fam1;fam2
acgtacgtcccaaata
>orphan
gagagagagagagaga
";

pub fn families_db() -> SequenceDatabase {
    SequenceDatabase::from_fasta_str(FAMILIES_FASTA, Alphabet::dna(), layout()).expect("fixture parses")
}

pub fn layout() -> FieldLayout {
    FieldLayout::new().with_class_field(Some(1))
}

/// Exact-match clustering with a vocabulary large enough to hold every
/// distinct 4-mer of the fixture.
pub fn exact_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.cluster.kmer_length = 4;
    config.cluster.threshold = 0;
    config.cluster.workers = 2;
    config.cluster.keep_members = true;
    config.vocabulary.size = 256;
    config.rank.max_matches = 10;
    config.database.layout = layout();
    config
}

pub fn write_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("families.fa");
    fs::write(&path, FAMILIES_FASTA).expect("write fixture");
    path
}

/// Records every stage event.
#[derive(Default)]
pub struct RecordingMetrics {
    pub events: Mutex<Vec<(Stage, StageAction, bool)>>,
}

impl RecordingMetrics {
    pub fn events(&self) -> Vec<(Stage, StageAction, bool)> {
        self.events.lock().unwrap().clone()
    }
}

impl PipelineMetrics for RecordingMetrics {
    fn record_stage(
        &self,
        stage: Stage,
        action: StageAction,
        _latency: Duration,
        result: Result<(), &PipelineError>,
    ) {
        self.events.lock().unwrap().push((stage, action, result.is_ok()));
    }
}
