//! YAML configuration for the search pipeline.
//!
//! Every stage reads its settings from one file. Sections that are omitted
//! fall back to the stage defaults, and every section is validated before
//! the pipeline touches any data.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "16S families"
//!
//! matrix:
//!   alphabet: dna
//!   kind: match_mismatch
//!   match_cost: 0
//!   mismatch_cost: 1
//!   kernel_mode: auto
//!
//! database:
//!   path: data/families.fa
//!   layout:
//!     separator: "|"
//!     id_field: 0
//!     class_field: 1
//!
//! partition:
//!   test_fraction: 0.1
//!   seed: 7
//!
//! cluster:
//!   kmer_length: 8
//!   threshold: 1
//!   coverage: 95.0
//!
//! vocabulary:
//!   size: 512
//!   policy: min_hash
//!
//! signature:
//!   threshold: 1
//!   mode: presence
//!
//! rank:
//!   max_matches: 50
//!   policy: jaccard
//!
//! eval:
//!   recall_steps: 10
//!
//! output:
//!   directory: out/
//!   format: binary
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cluster::{ClusterConfig, VocabularyConfig};
use eval::EvalConfig;
use index::RankConfig;
use kernel::{Distance, KernelMode};
use sequence::{Alphabet, FieldLayout, SimilarityMatrix};
use signature::SignatureConfig;

use crate::store::ArtifactFormat;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Top-level configuration of a search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub matrix: MatrixConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub partition: PartitionConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub vocabulary: VocabularyConfig,

    #[serde(default)]
    pub signature: SignatureConfig,

    #[serde(default)]
    pub rank: RankConfig,

    #[serde(default)]
    pub eval: EvalConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Size of the dedicated worker pool. `0` runs on the global rayon pool.
    #[serde(default)]
    pub threads: usize,
}

impl EngineConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.matrix.validate()?;
        self.database.validate()?;
        self.partition.validate()?;
        self.cluster.validate().map_err(section("cluster"))?;
        self.vocabulary.validate().map_err(section("vocabulary"))?;
        self.signature.validate().map_err(section("signature"))?;
        self.rank.validate().map_err(section("rank"))?;
        self.eval.validate().map_err(section("eval"))?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            name: None,
            matrix: MatrixConfig::default(),
            database: DatabaseConfig::default(),
            partition: PartitionConfig::default(),
            cluster: ClusterConfig::default(),
            vocabulary: VocabularyConfig::default(),
            signature: SignatureConfig::default(),
            rank: RankConfig::default(),
            eval: EvalConfig::default(),
            output: OutputConfig::default(),
            threads: 0,
        }
    }
}

fn section<E: std::fmt::Display>(name: &'static str) -> impl Fn(E) -> ConfigLoadError {
    move |e| ConfigLoadError::Validation(format!("{name}: {e}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphabetKind {
    #[default]
    Dna,
    Protein,
    /// Characters listed in `matrix.characters`.
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixKind {
    /// `match_cost` on the diagonal, `mismatch_cost` elsewhere.
    #[default]
    MatchMismatch,
    /// BLOSUM62 scores converted to costs. Protein alphabet only.
    Blosum62,
}

/// Alphabet, substitution costs and kernel mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    #[serde(default)]
    pub alphabet: AlphabetKind,

    #[serde(default)]
    pub characters: Option<String>,

    #[serde(default)]
    pub kind: MatrixKind,

    #[serde(default)]
    pub match_cost: Distance,

    #[serde(default = "default_mismatch_cost")]
    pub mismatch_cost: Distance,

    #[serde(default)]
    pub kernel_mode: KernelMode,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            alphabet: AlphabetKind::Dna,
            characters: None,
            kind: MatrixKind::MatchMismatch,
            match_cost: 0,
            mismatch_cost: default_mismatch_cost(),
            kernel_mode: KernelMode::Auto,
        }
    }
}

impl MatrixConfig {
    pub fn alphabet(&self) -> Result<Alphabet, ConfigLoadError> {
        match self.alphabet {
            AlphabetKind::Dna => Ok(Alphabet::dna()),
            AlphabetKind::Protein => Ok(Alphabet::protein()),
            AlphabetKind::Custom => {
                let chars = self
                    .characters
                    .as_deref()
                    .ok_or_else(|| ConfigLoadError::MissingField("matrix.characters".to_string()))?;
                Alphabet::new(chars).map_err(section("matrix"))
            }
        }
    }

    /// Build the substitution matrix this section describes.
    pub fn build(&self) -> Result<SimilarityMatrix, ConfigLoadError> {
        match self.kind {
            MatrixKind::MatchMismatch => Ok(SimilarityMatrix::match_mismatch(
                self.alphabet()?,
                self.match_cost,
                self.mismatch_cost,
            )),
            MatrixKind::Blosum62 if self.alphabet == AlphabetKind::Protein => {
                Ok(SimilarityMatrix::blosum62())
            }
            MatrixKind::Blosum62 => Err(ConfigLoadError::Validation(
                "matrix: blosum62 requires the protein alphabet".to_string(),
            )),
        }
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.match_cost < 0 || self.mismatch_cost < 0 {
            return Err(ConfigLoadError::Validation(format!(
                "matrix: costs must be >= 0 (got match {}, mismatch {})",
                self.match_cost, self.mismatch_cost
            )));
        }
        if self.match_cost > self.mismatch_cost {
            return Err(ConfigLoadError::Validation(format!(
                "matrix: match_cost must not exceed mismatch_cost (got {} > {})",
                self.match_cost, self.mismatch_cost
            )));
        }
        self.build().map(|_| ())
    }
}

/// Where sequences come from and how their headers are read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// FASTA file. Required unless the database is supplied programmatically.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub layout: FieldLayout,
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.layout.validate().map_err(section("database.layout"))
    }
}

/// Training/test split. Without `test_fraction` every sequence is both
/// indexed and queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    #[serde(default)]
    pub test_fraction: Option<f64>,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            test_fraction: None,
            seed: default_seed(),
        }
    }
}

impl PartitionConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.test_fraction {
            Some(f) if !(f > 0.0 && f < 1.0) => Err(ConfigLoadError::Validation(format!(
                "partition: test_fraction must be within (0, 1) (got {f})"
            ))),
            _ => Ok(()),
        }
    }
}

/// Where artifacts are written after a full run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default)]
    pub format: ArtifactFormat,
}

fn default_config_version() -> String {
    "1.0".to_string()
}
fn default_mismatch_cost() -> Distance {
    1
}
fn default_seed() -> u64 {
    0x5EED_0F_5EA5
}
