//! Error types produced by the sequence crate.
//!
//! Errors are typed and cloneable so callers can match on the exact failure
//! instead of parsing strings.
//!
//! | Error | Category | Description |
//! |-------|----------|-------------|
//! | [`InvalidAlphabet`](SequenceError::InvalidAlphabet) | Configuration | Alphabet definition rejected |
//! | [`MatrixShape`](SequenceError::MatrixShape) | Configuration | Cost table does not match the alphabet |
//! | [`MatrixParse`](SequenceError::MatrixParse) | Input | Malformed substitution matrix text |
//! | [`MissingField`](SequenceError::MissingField) | Input | FASTA header lacks the configured id field |
//! | [`DuplicateId`](SequenceError::DuplicateId) | Input | Two records share a unique id |
//! | [`InvalidFraction`](SequenceError::InvalidFraction) | Configuration | Test split fraction outside `[0, 1]` |
//! | [`Io`](SequenceError::Io) | I/O | Database file could not be read |

use thiserror::Error;

/// Errors returned while building alphabets, matrices and sequence databases.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SequenceError {
    #[error("invalid alphabet: {reason}")]
    InvalidAlphabet { reason: String },

    #[error("invalid matrix shape: expected {expected}x{expected}, got {rows}x{cols}")]
    MatrixShape {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    #[error("matrix parse error at line {line}: {reason}")]
    MatrixParse { line: usize, reason: String },

    #[error("record {record} has no field {field} in header {header:?}")]
    MissingField {
        record: usize,
        field: usize,
        header: String,
    },

    #[error("duplicate sequence id {id:?}")]
    DuplicateId { id: String },

    #[error("residues found before the first header at line {line}")]
    OrphanResidues { line: usize },

    #[error("invalid field layout: {0}")]
    InvalidLayout(String),

    #[error("invalid partition: test fraction must be within [0, 1] (got {fraction})")]
    InvalidFraction { fraction: f64 },

    #[error("sequence index {index} out of range for database of {len} sequences")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SequenceError {
    fn from(e: std::io::Error) -> Self {
        SequenceError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_offending_values() {
        let err = SequenceError::MatrixShape {
            expected: 4,
            rows: 3,
            cols: 4,
        };
        assert_eq!(
            err.to_string(),
            "invalid matrix shape: expected 4x4, got 3x4"
        );

        let err = SequenceError::DuplicateId { id: "seq-1".into() };
        assert!(err.to_string().contains("seq-1"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.fa");
        let err: SequenceError = io.into();
        assert!(matches!(err, SequenceError::Io(msg) if msg.contains("missing.fa")));
    }
}
