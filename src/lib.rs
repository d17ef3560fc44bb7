//! Workspace umbrella crate for prototype-vocabulary k-mer search.
//!
//! The engine crates each own one stage:
//!
//! - `sequence`: alphabets, substitution matrices, the FASTA-backed
//!   [`SequenceDatabase`] and training/test [`Partition`]s.
//! - `kernel`: the diagonal sliding-window distance kernel.
//! - `cluster`: greedy threshold covering into [`Prototype`]s and
//!   vocabulary selection.
//! - `signature`: sparse presence/count signatures against a vocabulary.
//! - `index`: posting lists, bounded top-K ranking and relevance judgement.
//! - `eval`: interpolated precision and mean average precision.
//!
//! This crate wires them into a [`Pipeline`] driven by one YAML
//! [`EngineConfig`], persists every stage through the [`store`] module and
//! reports stage latencies to an optional [`PipelineMetrics`] observer.
//!
//! ```no_run
//! use kmersearch::{EngineConfig, Pipeline};
//!
//! let config = EngineConfig::from_file("search.yaml")?;
//! let mut pipeline = Pipeline::new(config)?;
//! let evaluation = pipeline.run_all()?;
//! println!("MAP {:.4}", evaluation.map);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use cluster::{
    ClusterConfig, ClusterError, Clustering, ClusteringEngine, ClusteringStats, Prototype,
    Vocabulary, VocabularyConfig, VocabularyPolicy, select_vocabulary,
};
pub use eval::{EvalConfig, EvalError, Evaluation, QueryScore, evaluate};
pub use index::{
    IndexError, PostingList, RankConfig, RankedHit, Ranker, Ranking, RelevanceJudge,
    ScoringPolicy,
};
pub use kernel::{DiagonalDistanceEngine, KernelError, KernelMode, WindowMinima};
pub use sequence::{
    Alphabet, ClassPostingList, Distance, FieldLayout, Kmer, KmerInstance, Partition, Sequence,
    SequenceDatabase, SequenceError, SimilarityMatrix,
};
pub use signature::{EncodeMode, SignatureConfig, SignatureEncoder, SignatureError, SparseSignature};

pub use crate::config::{ConfigLoadError, EngineConfig};
pub use crate::metrics::{PipelineMetrics, StageAction};
pub use crate::pipeline::{Pipeline, Stage, StageStatus};
pub use crate::store::ArtifactFormat;

/// Errors surfaced by the pipeline. Stage errors are wrapped unchanged.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("sequence failure: {0}")]
    Sequence(#[from] SequenceError),

    #[error("kernel failure: {0}")]
    Kernel(#[from] KernelError),

    #[error("clustering failure: {0}")]
    Cluster(#[from] ClusterError),

    #[error("signature failure: {0}")]
    Signature(#[from] SignatureError),

    #[error("index failure: {0}")]
    Index(#[from] IndexError),

    #[error("evaluation failure: {0}")]
    Eval(#[from] EvalError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{artifact} load mismatch on {field}: expected {expected}, found {found}")]
    LoadMismatch {
        artifact: &'static str,
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("{artifact} record {record:?} references feature {feature}, vocabulary has {vocabulary_size}")]
    OutOfRange {
        artifact: &'static str,
        record: String,
        feature: u32,
        vocabulary_size: usize,
    },

    #[error("{artifact} references unknown sequence id {id:?}")]
    UnknownSequence { artifact: &'static str, id: String },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {artifact}: {reason}")]
    Encode { artifact: &'static str, reason: String },

    #[error("failed to decode {artifact}: {reason}")]
    Decode { artifact: &'static str, reason: String },

    #[error("stage {stage} is not ready: {reason}")]
    Stage { stage: Stage, reason: String },
}

impl From<ConfigLoadError> for PipelineError {
    fn from(value: ConfigLoadError) -> Self {
        PipelineError::Configuration(value.to_string())
    }
}
