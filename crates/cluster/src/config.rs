//! Configuration and error types for clustering and vocabulary selection.
//!
//! Both configs are validated before any work starts, so a rejected config
//! never leaves partial results behind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use kernel::Distance;
use sequence::KmerInstance;

/// Greedy threshold-covering parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    /// Window length of every k-mer in the population.
    pub kmer_length: usize,
    /// Maximum aligned distance for an instance to join a prototype.
    pub threshold: Distance,
    /// Percentage of the population to cover before stopping, in `(0, 100]`.
    pub coverage: f64,
    /// Shuffle seed.
    pub seed: u64,
    /// Number of population ranges. `0` uses the rayon pool size.
    pub workers: usize,
    /// Run the full reinsertion pass that fills final sizes and purity.
    pub reinsert: bool,
    /// Compute Shannon entropy during reinsertion.
    pub entropy: bool,
    /// Keep member lists for every prototype.
    pub keep_members: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kmer_length: 8,
            threshold: 0,
            coverage: 100.0,
            seed: 0x5EED_C1A5_7E25_0001,
            workers: 0,
            reinsert: true,
            entropy: true,
            keep_members: false,
        }
    }
}

impl ClusterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kmer_length(mut self, k: usize) -> Self {
        self.kmer_length = k;
        self
    }

    pub fn with_threshold(mut self, threshold: Distance) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_coverage(mut self, coverage: f64) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_reinsert(mut self, reinsert: bool) -> Self {
        self.reinsert = reinsert;
        self
    }

    pub fn with_entropy(mut self, entropy: bool) -> Self {
        self.entropy = entropy;
        self
    }

    pub fn with_keep_members(mut self, keep_members: bool) -> Self {
        self.keep_members = keep_members;
        self
    }

    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.kmer_length < 1 {
            return Err(ClusterError::InvalidConfigK {
                k: self.kmer_length,
            });
        }
        if self.threshold < 0 {
            return Err(ClusterError::InvalidConfigThreshold {
                threshold: self.threshold,
            });
        }
        if !(self.coverage > 0.0 && self.coverage <= 100.0) {
            return Err(ClusterError::InvalidConfigCoverage {
                coverage: self.coverage,
            });
        }
        Ok(())
    }
}

/// How a vocabulary is drawn from the prototype list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyPolicy {
    /// The first `size` prototypes, i.e. the largest clusters.
    #[default]
    FirstN,
    /// Simple random sample without replacement, in prototype order.
    Uniform,
    /// The `size` prototypes whose k-mer hashes are smallest.
    MinHash,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VocabularyConfig {
    pub size: usize,
    pub policy: VocabularyPolicy,
    pub seed: u64,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            size: 1024,
            policy: VocabularyPolicy::FirstN,
            seed: 0xF00D_BAAD_F00D_BAAD,
        }
    }
}

impl VocabularyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_policy(mut self, policy: VocabularyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.size < 1 {
            return Err(ClusterError::InvalidConfigVocabularySize { size: self.size });
        }
        Ok(())
    }
}

/// Errors returned by clustering and vocabulary selection.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClusterError {
    #[error("invalid config: kmer_length must be >= 1 (got {k})")]
    InvalidConfigK { k: usize },

    #[error("invalid config: threshold must be >= 0 (got {threshold})")]
    InvalidConfigThreshold { threshold: Distance },

    #[error("invalid config: coverage must be within (0, 100] (got {coverage})")]
    InvalidConfigCoverage { coverage: f64 },

    #[error("invalid config: vocabulary size must be >= 1 (got {size})")]
    InvalidConfigVocabularySize { size: usize },

    #[error("k-mer instance {instance:?} does not fit a window of length {k}")]
    InstanceOutOfRange { instance: KmerInstance, k: usize },

    #[error("prototype k-mer has length {found}, expected {expected}")]
    KmerLength { expected: usize, found: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ClusterConfig::default().validate().is_ok());
        assert!(VocabularyConfig::default().validate().is_ok());
        assert_eq!(ClusterConfig::new(), ClusterConfig::default());
    }

    #[test]
    fn builder_chain() {
        let cfg = ClusterConfig::new()
            .with_kmer_length(4)
            .with_threshold(3)
            .with_coverage(80.0)
            .with_seed(9)
            .with_workers(2)
            .with_reinsert(false)
            .with_entropy(false)
            .with_keep_members(true);
        assert_eq!(cfg.kmer_length, 4);
        assert_eq!(cfg.threshold, 3);
        assert_eq!(cfg.coverage, 80.0);
        assert_eq!(cfg.workers, 2);
        assert!(!cfg.reinsert);
        assert!(cfg.keep_members);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            ClusterConfig::new().with_threshold(-1).validate(),
            Err(ClusterError::InvalidConfigThreshold { threshold: -1 })
        );
        for coverage in [0.0, -5.0, 100.5, f64::NAN] {
            assert!(matches!(
                ClusterConfig::new().with_coverage(coverage).validate(),
                Err(ClusterError::InvalidConfigCoverage { .. })
            ));
        }
        assert_eq!(
            ClusterConfig::new().with_kmer_length(0).validate(),
            Err(ClusterError::InvalidConfigK { k: 0 })
        );
        assert_eq!(
            VocabularyConfig::new().with_size(0).validate(),
            Err(ClusterError::InvalidConfigVocabularySize { size: 0 })
        );
    }

    #[test]
    fn policy_serializes_snake_case() {
        let json = serde_json::to_string(&VocabularyPolicy::MinHash).unwrap();
        assert_eq!(json, "\"min_hash\"");
        let back: VocabularyPolicy = serde_json::from_str("\"first_n\"").unwrap();
        assert_eq!(back, VocabularyPolicy::FirstN);
    }
}
