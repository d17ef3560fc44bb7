//! # Prototype clustering
//!
//! Builds a compact set of representative k-mers ("prototypes") that covers a
//! k-mer population, then reduces it to a fixed-size [`Vocabulary`].
//!
//! 1. **Covering** ([`ClusteringEngine::cluster`]): seeded shuffle, disjoint
//!    worker ranges, greedy selection with parallel swap-compaction until the
//!    configured coverage is reached. Prototypes come out ordered by
//!    descending initial cluster size.
//! 2. **Reinsertion** (optional): every prototype is matched against the
//!    whole population to compute final sizes, class purity and entropy.
//! 3. **Vocabulary** ([`select_vocabulary`]): first-N, uniform sample or
//!    min-hash selection.
//!
//! Every step is deterministic for a fixed seed and worker count.
//!
//! ```
//! use cluster::{select_vocabulary, ClusterConfig, ClusteringEngine, VocabularyConfig};
//! use kernel::DiagonalDistanceEngine;
//! use sequence::{Alphabet, FieldLayout, SequenceDatabase, SimilarityMatrix};
//!
//! let db = SequenceDatabase::from_fasta_str(">a\nacgtacgt\n", Alphabet::dna(), FieldLayout::new())?;
//! let kernel = DiagonalDistanceEngine::symbols(SimilarityMatrix::match_mismatch(Alphabet::dna(), 0, 1));
//! let engine = ClusteringEngine::new(kernel, ClusterConfig::new().with_kmer_length(4))?;
//! let population = db.kmer_population(&[0], 4)?;
//! let clustering = engine.cluster(&db, &population)?;
//! assert_eq!(clustering.len(), 4);
//!
//! let vocabulary = select_vocabulary(&clustering.prototypes, 4, &VocabularyConfig::new().with_size(2))?;
//! assert_eq!(vocabulary.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
mod engine;
mod prototype;
mod reinsert;
mod vocabulary;

pub use crate::config::{ClusterConfig, ClusterError, VocabularyConfig, VocabularyPolicy};
pub use crate::engine::ClusteringEngine;
pub use crate::prototype::{Clustering, ClusteringStats, Prototype};
pub use crate::vocabulary::{select_vocabulary, Vocabulary};
