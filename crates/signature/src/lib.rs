//! Sparse bag-of-k-mers signatures.
//!
//! A sequence's [`SparseSignature`] lists the vocabulary terms it contains:
//! term `i` is present when some k-mer of the sequence lies within the
//! configured distance of prototype `i`. [`SignatureEncoder`] builds them,
//! in parallel across sequences.

mod encoder;
mod sparse;

use thiserror::Error;

use kernel::Distance;

pub use crate::encoder::{EncodeMode, SignatureConfig, SignatureEncoder};
pub use crate::sparse::SparseSignature;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid config: signature threshold must be >= 0 (got {threshold})")]
    InvalidConfigThreshold { threshold: Distance },

    #[error("signature ids must be strictly increasing (violated at position {position})")]
    NotIncreasing { position: usize },

    #[error("signature has {ids} ids but {weights} weights")]
    WeightLength { ids: usize, weights: usize },
}
