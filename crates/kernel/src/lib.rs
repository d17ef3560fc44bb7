//! Sliding-window k-mer distance kernel.
//!
//! For a query of `m` k-mers and a subject of `n` k-mers the window distance
//! is `W(r, c) = Σ_{t<k} cost(query[r + t], subject[c + t])`. The
//! [`DiagonalDistanceEngine`] visits every diagonal once, keeping a length-`k`
//! circular buffer of per-position costs so each step along a diagonal costs
//! one subtraction and one addition. It reports the minimum window distance
//! per query row and per subject column.
//!
//! For even `k` and alphabets with a digram table, the digram path looks up
//! pair costs directly and walks each diagonal as two interleavings with
//! `k / 2` buffered terms each. Both paths produce identical results.

mod diagonal;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::diagonal::{DiagonalDistanceEngine, WindowMinima};
pub use sequence::Distance;

/// Which cost table the kernel reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelMode {
    /// Per-symbol costs for every k.
    Symbols,
    /// Digram pair costs for even k. Odd k falls back to symbols.
    Digrams,
    /// Digrams when k is even and the matrix carries a digram table.
    #[default]
    Auto,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("invalid kernel mode: matrix {matrix:?} has no digram table")]
    DigramTableUnavailable { matrix: String },
}
