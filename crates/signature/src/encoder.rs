use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use cluster::Vocabulary;
use kernel::{DiagonalDistanceEngine, Distance};
use sequence::{Sequence, SequenceDatabase};

use crate::{SignatureError, SparseSignature};

/// What a signature records per vocabulary term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeMode {
    /// Term present if any k-mer is within threshold; scanning stops at the
    /// first hit.
    #[default]
    Presence,
    /// Number of k-mers within threshold, stored as the weight.
    Counts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Maximum aligned distance between a sequence k-mer and a term.
    pub threshold: Distance,
    pub mode: EncodeMode,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            threshold: 0,
            mode: EncodeMode::Presence,
        }
    }
}

impl SignatureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: Distance) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_mode(mut self, mode: EncodeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validate(&self) -> Result<(), SignatureError> {
        if self.threshold < 0 {
            return Err(SignatureError::InvalidConfigThreshold {
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

/// Encodes sequences against a vocabulary with the vocabulary's k.
#[derive(Debug, Clone, Copy)]
pub struct SignatureEncoder<'a> {
    vocabulary: &'a Vocabulary,
    kernel: &'a DiagonalDistanceEngine,
    cfg: &'a SignatureConfig,
}

impl<'a> SignatureEncoder<'a> {
    pub fn new(
        vocabulary: &'a Vocabulary,
        kernel: &'a DiagonalDistanceEngine,
        cfg: &'a SignatureConfig,
    ) -> Result<Self, SignatureError> {
        cfg.validate()?;
        Ok(Self {
            vocabulary,
            kernel,
            cfg,
        })
    }

    /// Feature ids come out in increasing order because terms are visited in
    /// vocabulary order.
    pub fn encode(&self, sequence: &Sequence) -> SparseSignature {
        let k = self.vocabulary.kmer_length();
        let positions = sequence.kmer_count(k);
        let mut ids = Vec::new();
        let mut weights = Vec::new();

        for (feature, term) in self.vocabulary.iter().enumerate() {
            let term = term.kmer.view();
            let within = |offset: usize| {
                sequence
                    .kmer(offset, k)
                    .is_some_and(|window| self.kernel.aligned_distance(window, term) <= self.cfg.threshold)
            };
            match self.cfg.mode {
                EncodeMode::Presence => {
                    if (0..positions).any(within) {
                        ids.push(feature as u32);
                    }
                }
                EncodeMode::Counts => {
                    let hits = (0..positions).filter(|&offset| within(offset)).count();
                    if hits > 0 {
                        ids.push(feature as u32);
                        weights.push(hits as u32);
                    }
                }
            }
        }

        let weights = (self.cfg.mode == EncodeMode::Counts).then_some(weights);
        SparseSignature::from_parts_unchecked(ids, weights)
    }

    /// Encode every sequence of the database in parallel, in database order.
    pub fn encode_all(&self, db: &SequenceDatabase) -> Vec<SparseSignature> {
        let started = Instant::now();
        let signatures: Vec<SparseSignature> = db
            .sequences()
            .par_iter()
            .map(|sequence| self.encode(sequence))
            .collect();
        let features: usize = signatures.iter().map(SparseSignature::len).sum();
        info!(
            sequences = signatures.len(),
            vocabulary = self.vocabulary.len(),
            features,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "signatures encoded"
        );
        signatures
    }
}
