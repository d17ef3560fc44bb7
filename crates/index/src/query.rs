use rayon::prelude::*;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use signature::SparseSignature;

use crate::topk::{BoundedTopK, RankedHit};
use crate::{IndexError, PostingList};

/// How a candidate's distance to the query is scored. Lower is closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// `1 - jaccard`.
    #[default]
    Jaccard,
    /// `1 - cosine` over signature weights.
    Cosine,
    /// Negated weighted dot product.
    NegatedDot,
}

impl ScoringPolicy {
    #[inline]
    pub fn distance(self, query: &SparseSignature, candidate: &SparseSignature) -> f64 {
        match self {
            ScoringPolicy::Jaccard => 1.0 - query.jaccard(candidate),
            ScoringPolicy::Cosine => 1.0 - query.cosine(candidate),
            ScoringPolicy::NegatedDot => -(query.dot(candidate) as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// Capacity of every ranking.
    pub max_matches: usize,
    pub policy: ScoringPolicy,
    /// Drop the query's own sequence from its ranking.
    pub exclude_self: bool,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            max_matches: 100,
            policy: ScoringPolicy::Jaccard,
            exclude_self: true,
        }
    }
}

impl RankConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_matches(mut self, max_matches: usize) -> Self {
        self.max_matches = max_matches;
        self
    }

    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_exclude_self(mut self, exclude_self: bool) -> Self {
        self.exclude_self = exclude_self;
        self
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.max_matches < 1 {
            return Err(IndexError::InvalidConfigMaxMatches {
                max_matches: self.max_matches,
            });
        }
        Ok(())
    }
}

/// Ranked neighbours of one query.
///
/// `hits` ascend by distance and hold at most `capacity` distinct candidates.
/// Once `judged`, `precision` and `recall` are aligned with `hits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub query: u32,
    pub capacity: usize,
    pub hits: Vec<RankedHit>,
    pub judged: bool,
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
}

impl Ranking {
    pub fn new(query: u32, capacity: usize, hits: Vec<RankedHit>) -> Self {
        Self {
            query,
            capacity,
            hits,
            judged: false,
            precision: Vec::new(),
            recall: Vec::new(),
        }
    }
}

/// Nearest-neighbour search over indexed signatures.
#[derive(Debug, Clone, Copy)]
pub struct Ranker<'a> {
    signatures: &'a [SparseSignature],
    postings: &'a PostingList,
    cfg: &'a RankConfig,
}

impl<'a> Ranker<'a> {
    pub fn new(
        signatures: &'a [SparseSignature],
        postings: &'a PostingList,
        cfg: &'a RankConfig,
    ) -> Result<Self, IndexError> {
        cfg.validate()?;
        Ok(Self {
            signatures,
            postings,
            cfg,
        })
    }

    /// Rank indexed sequences against `signature`. Only candidates sharing at
    /// least one feature with the query are scored.
    pub fn rank(&self, query: u32, signature: &SparseSignature) -> Ranking {
        let mut visited = RoaringBitmap::new();
        let mut top = BoundedTopK::new(self.cfg.max_matches);

        for &feature in signature.ids() {
            for &candidate in self.postings.get(feature) {
                if !visited.insert(candidate) {
                    continue;
                }
                if self.cfg.exclude_self && candidate == query {
                    continue;
                }
                let Some(other) = self.signatures.get(candidate as usize) else {
                    continue;
                };
                top.offer(candidate, self.cfg.policy.distance(signature, other));
            }
        }
        Ranking::new(query, self.cfg.max_matches, top.into_sorted())
    }

    /// Rank the stored signature of every query index, in parallel.
    pub fn rank_all(&self, queries: &[usize]) -> Result<Vec<Ranking>, IndexError> {
        if let Some(&index) = queries.iter().find(|&&q| q >= self.signatures.len()) {
            return Err(IndexError::SequenceOutOfRange {
                index,
                len: self.signatures.len(),
            });
        }
        let rankings: Vec<Ranking> = queries
            .par_iter()
            .map(|&q| self.rank(q as u32, &self.signatures[q]))
            .collect();
        log::info!(
            "ranked {} queries against {} indexed sequences",
            rankings.len(),
            self.postings.documents()
        );
        Ok(rankings)
    }
}
