//! Sequence model for k-mer search.
//!
//! This crate owns everything the later stages read but never mutate:
//!
//! - [`Alphabet`]: character ↔ [`Symbol`] mapping with a reserved
//!   [`DEFAULT_SYMBOL`] for padding and unknown characters.
//! - [`SimilarityMatrix`]: dense substitution cost table plus a digram pair
//!   table for small alphabets.
//! - [`Sequence`], [`KmerView`], [`Kmer`] and [`KmerInstance`].
//! - [`SequenceDatabase`]: FASTA loader with configurable header fields and
//!   interned ids/classes.
//! - [`Partition`] and [`ClassPostingList`].
//!
//! ```
//! use sequence::{Alphabet, FieldLayout, SequenceDatabase, SimilarityMatrix};
//!
//! let db = SequenceDatabase::from_fasta_str(">s1\nacgt\n", Alphabet::dna(), FieldLayout::new())?;
//! let matrix = SimilarityMatrix::match_mismatch(Alphabet::dna(), 0, 1);
//! let seq = db.get(0).unwrap();
//! assert_eq!(seq.kmer_count(2), 3);
//! assert_eq!(matrix.window_distance(&seq.symbols()[..2], &seq.symbols()[1..3]), 2);
//! # Ok::<(), sequence::SequenceError>(())
//! ```

mod alphabet;
mod database;
mod error;
mod matrix;
mod partition;
mod sequence;

pub use crate::alphabet::{
    Alphabet, Digram, Symbol, DEFAULT_CHAR, DEFAULT_SYMBOL, DNA_CHARS, MAX_ALPHABET_LEN,
    PROTEIN_CHARS,
};
pub use crate::database::{FieldLayout, Interner, SequenceDatabase};
pub use crate::error::SequenceError;
pub use crate::matrix::{is_default, Distance, MatrixRecord, SimilarityMatrix, BLOSUM62, DIGRAM_TABLE_LIMIT};
pub use crate::partition::{ClassPostingList, Partition};
pub use crate::sequence::{Kmer, KmerInstance, KmerView, Sequence};
