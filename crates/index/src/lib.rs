//! # K-mer signature index
//!
//! Inverted index and nearest-neighbour ranking over [`SparseSignature`]s.
//!
//! ## Core Features
//!
//! - **Posting list** ([`PostingList`]): feature id → indices of the indexed
//!   sequences whose signature carries it, built in one pass over a subset.
//! - **Ranking** ([`Ranker`]): for each query feature, every not yet visited
//!   posting is scored by the configured [`ScoringPolicy`] and offered to a
//!   [`BoundedTopK`]. Visited candidates are tracked in a roaring bitmap, so
//!   only candidates sharing at least one feature are ever scored, and each
//!   at most once.
//! - **Relevance** ([`RelevanceJudge`]): precision and recall per rank from
//!   class labels, with backward smoothing of precision.
//!
//! ## Example Usage
//!
//! ```
//! use index::{PostingList, RankConfig, Ranker};
//! use signature::SparseSignature;
//!
//! let signatures = vec![
//!     SparseSignature::from_ids(vec![0, 1]),
//!     SparseSignature::from_ids(vec![1, 2]),
//!     SparseSignature::from_ids(vec![3]),
//! ];
//! let postings = PostingList::build(&signatures, &[0, 1, 2], 4).unwrap();
//! let cfg = RankConfig::new().with_max_matches(10);
//! let ranker = Ranker::new(&signatures, &postings, &cfg).unwrap();
//!
//! let ranking = ranker.rank(0, &signatures[0]);
//! assert_eq!(ranking.hits.len(), 1);
//! assert_eq!(ranking.hits[0].candidate, 1);
//! ```

mod posting;
mod query;
mod relevance;
mod topk;

use thiserror::Error;

pub use crate::posting::PostingList;
pub use crate::query::{RankConfig, Ranker, Ranking, ScoringPolicy};
pub use crate::relevance::{smooth_backward, RelevanceJudge};
pub use crate::topk::{BoundedTopK, RankedHit};

#[cfg(doc)]
use signature::SparseSignature;

/// Errors returned while indexing or ranking.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("invalid config: max_matches must be >= 1 (got {max_matches})")]
    InvalidConfigMaxMatches { max_matches: usize },

    #[error("sequence {sequence} carries feature {feature}, vocabulary has {vocabulary_size}")]
    FeatureOutOfRange {
        sequence: usize,
        feature: u32,
        vocabulary_size: usize,
    },

    #[error("sequence index {index} out of range ({len} signatures)")]
    SequenceOutOfRange { index: usize, len: usize },
}
