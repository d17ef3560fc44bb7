//! Vocabulary selection.
//!
//! A [`Vocabulary`] is an ordered subset of prototypes; a prototype's
//! position is its feature id in every signature built against it.

use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::info;
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::config::{ClusterError, VocabularyConfig, VocabularyPolicy};
use crate::prototype::Prototype;

/// Fixed, ordered feature set. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    kmer_length: usize,
    prototypes: Vec<Prototype>,
}

impl Vocabulary {
    /// Wrap prototypes that all have `kmer_length` symbols.
    pub fn new(kmer_length: usize, prototypes: Vec<Prototype>) -> Result<Self, ClusterError> {
        if let Some(p) = prototypes.iter().find(|p| p.kmer.len() != kmer_length) {
            return Err(ClusterError::KmerLength {
                expected: kmer_length,
                found: p.kmer.len(),
            });
        }
        Ok(Self {
            kmer_length,
            prototypes,
        })
    }

    pub fn kmer_length(&self) -> usize {
        self.kmer_length
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }

    pub fn get(&self, feature: usize) -> Option<&Prototype> {
        self.prototypes.get(feature)
    }

    pub fn prototypes(&self) -> &[Prototype] {
        &self.prototypes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Prototype> {
        self.prototypes.iter()
    }
}

/// Pick `min(cfg.size, prototypes.len())` prototypes by `cfg.policy`.
pub fn select_vocabulary(
    prototypes: &[Prototype],
    kmer_length: usize,
    cfg: &VocabularyConfig,
) -> Result<Vocabulary, ClusterError> {
    cfg.validate()?;
    let size = cfg.size.min(prototypes.len());
    let picked = match cfg.policy {
        VocabularyPolicy::FirstN => (0..size).collect(),
        VocabularyPolicy::Uniform => uniform_sample(prototypes.len(), size, cfg.seed),
        VocabularyPolicy::MinHash => min_hash_select(prototypes, size, cfg.seed),
    };
    let chosen = picked.into_iter().map(|i| prototypes[i].clone()).collect();
    let vocabulary = Vocabulary::new(kmer_length, chosen)?;
    info!(
        policy = ?cfg.policy,
        requested = cfg.size,
        selected = vocabulary.len(),
        "vocabulary selected"
    );
    Ok(vocabulary)
}

/// Selection sampling: each index is kept with probability
/// `needed / left`, which draws exactly `size` indices in increasing order.
fn uniform_sample(n: usize, size: usize, seed: u64) -> Vec<usize> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut picked = Vec::with_capacity(size);
    let mut needed = size;
    for i in 0..n {
        if needed == 0 {
            break;
        }
        let left = n - i;
        if rng.f64() * (left as f64) < needed as f64 {
            picked.push(i);
            needed -= 1;
        }
    }
    picked
}

/// Keep the `size` prototypes with the smallest k-mer hashes, ordered by
/// hash then index.
fn min_hash_select(prototypes: &[Prototype], size: usize, seed: u64) -> Vec<usize> {
    if size == 0 {
        return Vec::new();
    }
    let key = splitmix64(seed);
    let mut heap: BinaryHeap<(u64, usize)> = BinaryHeap::with_capacity(size + 1);
    for (i, prototype) in prototypes.iter().enumerate() {
        let entry = (xxh3_64_with_seed(prototype.kmer.symbols(), key), i);
        if heap.len() < size {
            heap.push(entry);
        } else if heap.peek().is_some_and(|worst| entry < *worst) {
            heap.pop();
            heap.push(entry);
        }
    }
    heap.into_sorted_vec().into_iter().map(|(_, i)| i).collect()
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
