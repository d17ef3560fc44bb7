//! Substitution cost tables.
//!
//! A [`SimilarityMatrix`] owns a dense `dim × dim` cost table over the
//! alphabet's symbols (including [`DEFAULT_SYMBOL`]) and, for alphabets small
//! enough, a precomputed digram table where
//! `digram_cost(ab, cd) = cost(a, c) + cost(b, d)`.
//!
//! Costs are distances: lower means more similar. Matrices given as
//! similarity scores (BLOSUM and friends) are converted with
//! `cost(a, b) = s(a, a) + s(b, b) - 2 * s(a, b)`, which is zero on the
//! diagonal and symmetric. Any pair involving the default symbol costs the
//! largest cost in the table.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::alphabet::{Alphabet, Digram, Symbol, DEFAULT_SYMBOL};
use crate::error::SequenceError;

/// Window and pair distance type.
pub type Distance = i32;

/// Upper bound on digram table entries (`dim^4`).
pub const DIGRAM_TABLE_LIMIT: usize = 1 << 20;

/// BLOSUM62 in NCBI layout.
pub const BLOSUM62: &str = "\
#  Matrix made by matblas from blosum62.iij
#  BLOSUM Clustered Scoring Matrix in 1/2 Bit Units
   A  R  N  D  C  Q  E  G  H  I  L  K  M  F  P  S  T  W  Y  V  B  Z  X  *
A  4 -1 -2 -2  0 -1 -1  0 -2 -1 -1 -1 -1 -2 -1  1  0 -3 -2  0 -2 -1  0 -4
R -1  5  0 -2 -3  1  0 -2  0 -3 -2  2 -1 -3 -2 -1 -1 -3 -2 -3 -1  0 -1 -4
N -2  0  6  1 -3  0  0  0  1 -3 -3  0 -2 -3 -2  1  0 -4 -2 -3  3  0 -1 -4
D -2 -2  1  6 -3  0  2 -1 -1 -3 -4 -1 -3 -3 -1  0 -1 -4 -3 -3  4  1 -1 -4
C  0 -3 -3 -3  9 -3 -4 -3 -3 -1 -1 -3 -1 -2 -3 -1 -1 -2 -2 -1 -3 -3 -2 -4
Q -1  1  0  0 -3  5  2 -2  0 -3 -2  1  0 -3 -1  0 -1 -2 -1 -2  0  3 -1 -4
E -1  0  0  2 -4  2  5 -2  0 -3 -3  1 -2 -3 -1  0 -1 -3 -2 -2  1  4 -1 -4
G  0 -2  0 -1 -3 -2 -2  6 -2 -4 -4 -2 -3 -3 -2  0 -2 -2 -3 -3 -1 -2 -1 -4
H -2  0  1 -1 -3  0  0 -2  8 -3 -3 -1 -2 -1 -2 -1 -2 -2  2 -3  0  0 -1 -4
I -1 -3 -3 -3 -1 -3 -3 -4 -3  4  2 -3  1  0 -3 -2 -1 -3 -1  3 -3 -3 -1 -4
L -1 -2 -3 -4 -1 -2 -3 -4 -3  2  4 -2  2  0 -3 -2 -1 -2 -1  1 -4 -3 -1 -4
K -1  2  0 -1 -3  1  1 -2 -1 -3 -2  5 -1 -3 -1  0 -1 -3 -2 -2  0  1 -1 -4
M -1 -1 -2 -3 -1  0 -2 -3 -2  1  2 -1  5  0 -2 -1 -1 -1 -1  1 -3 -1 -1 -4
F -2 -3 -3 -3 -2 -3 -3 -3 -1  0  0 -3  0  6 -4 -2 -2  1  3 -1 -3 -3 -1 -4
P -1 -2 -2 -1 -3 -1 -1 -2 -2 -3 -3 -1 -2 -4  7 -1 -1 -4 -3 -2 -2 -1 -2 -4
S  1 -1  1  0 -1  0  0  0 -1 -2 -2  0 -1 -2 -1  4  1 -3 -2 -2  0  0  0 -4
T  0 -1  0 -1 -1 -1 -1 -2 -2 -1 -1 -1 -1 -2 -1  1  5 -2 -2  0 -1 -1  0 -4
W -3 -3 -4 -4 -2 -2 -3 -2 -2 -3 -2 -3 -1  1 -4 -3 -2 11  2 -3 -4 -3 -2 -4
Y -2 -2 -2 -3 -2 -1 -2 -3  2 -1 -1 -2 -1  3 -3 -2 -2  2  7 -1 -3 -2 -1 -4
V  0 -3 -3 -3 -1 -2 -2 -3 -3  3  1 -2  1 -1 -2 -2  0 -3 -1  4 -3 -2 -1 -4
B -2 -1  3  4 -3  0  1 -1  0 -3 -4  0 -3 -3 -2  0 -1 -4 -3 -3  4  1 -1 -4
Z -1  0  0  1 -3  3  4 -2  0 -3 -3  1 -1 -3 -1  0 -1 -3 -2 -2  1  4 -1 -4
X  0 -1 -1 -1 -2 -1 -1 -1 -1 -1 -1 -1 -1 -1 -2  0  0 -2 -1 -1 -1 -1 -1 -4
* -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4 -4  1
";

/// Dense substitution cost table over an alphabet.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MatrixRecord", into = "MatrixRecord")]
pub struct SimilarityMatrix {
    name: String,
    alphabet: Alphabet,
    dim: usize,
    costs: Arc<[Distance]>,
    digram_costs: Option<Arc<[Distance]>>,
    max_cost: Distance,
}

/// Serialized form: name, alphabet and the cost rows of declared characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRecord {
    pub name: String,
    pub alphabet: Alphabet,
    pub costs: Vec<Vec<Distance>>,
}

impl SimilarityMatrix {
    /// Build from an `n × n` cost table over the declared characters.
    pub fn from_costs(
        name: impl Into<String>,
        alphabet: Alphabet,
        costs: Vec<Vec<Distance>>,
    ) -> Result<Self, SequenceError> {
        let n = alphabet.len();
        if costs.len() != n {
            return Err(SequenceError::MatrixShape {
                expected: n,
                rows: costs.len(),
                cols: costs.first().map_or(0, Vec::len),
            });
        }
        if let Some(row) = costs.iter().find(|row| row.len() != n) {
            return Err(SequenceError::MatrixShape {
                expected: n,
                rows: costs.len(),
                cols: row.len(),
            });
        }

        let max_cost = costs.iter().flatten().copied().max().unwrap_or(0);
        let dim = alphabet.dim();
        let mut table = vec![max_cost; dim * dim];
        for (i, row) in costs.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                table[(i + 1) * dim + (j + 1)] = value;
            }
        }

        let digram_costs = build_digram_table(&table, dim);
        Ok(Self {
            name: name.into(),
            alphabet,
            dim,
            costs: table.into(),
            digram_costs,
            max_cost,
        })
    }

    /// Uniform costs: `match_cost` on the diagonal, `mismatch_cost` elsewhere.
    pub fn match_mismatch(alphabet: Alphabet, match_cost: Distance, mismatch_cost: Distance) -> Self {
        let n = alphabet.len();
        let costs = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if i == j { match_cost } else { mismatch_cost })
                    .collect()
            })
            .collect();
        Self::from_costs("match_mismatch", alphabet, costs)
            .expect("square cost table matches its alphabet")
    }

    /// Convert an `n × n` similarity score table into costs.
    pub fn from_similarity_scores(
        name: impl Into<String>,
        alphabet: Alphabet,
        scores: &[Vec<Distance>],
    ) -> Result<Self, SequenceError> {
        let n = alphabet.len();
        if scores.len() != n || scores.iter().any(|row| row.len() != n) {
            return Err(SequenceError::MatrixShape {
                expected: n,
                rows: scores.len(),
                cols: scores.first().map_or(0, Vec::len),
            });
        }
        let costs = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| scores[i][i] + scores[j][j] - 2 * scores[i][j])
                    .collect()
            })
            .collect();
        Self::from_costs(name, alphabet, costs)
    }

    /// Parse a score matrix in NCBI text layout and convert it to costs.
    ///
    /// Rows and columns for characters outside `alphabet` are ignored; every
    /// alphabet character must be present.
    pub fn parse_ncbi(
        name: impl Into<String>,
        text: &str,
        alphabet: Alphabet,
    ) -> Result<Self, SequenceError> {
        let mut header: Option<Vec<char>> = None;
        let mut rows: HashMap<char, Vec<Distance>> = HashMap::new();

        for (line_no, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut tokens = trimmed.split_whitespace();
            let Some(columns) = header.as_ref() else {
                let parsed: Result<Vec<char>, _> = tokens.map(single_char).collect();
                header = Some(parsed.map_err(|reason| SequenceError::MatrixParse {
                    line: line_no + 1,
                    reason,
                })?);
                continue;
            };

            let label = tokens
                .next()
                .map(single_char)
                .transpose()
                .map_err(|reason| SequenceError::MatrixParse {
                    line: line_no + 1,
                    reason,
                })?
                .ok_or_else(|| SequenceError::MatrixParse {
                    line: line_no + 1,
                    reason: "missing row label".into(),
                })?;
            let scores = tokens
                .map(|tok| tok.parse::<Distance>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| SequenceError::MatrixParse {
                    line: line_no + 1,
                    reason: e.to_string(),
                })?;
            if scores.len() != columns.len() {
                return Err(SequenceError::MatrixParse {
                    line: line_no + 1,
                    reason: format!(
                        "row {label:?} has {} scores, header has {}",
                        scores.len(),
                        columns.len()
                    ),
                });
            }
            rows.insert(label.to_ascii_lowercase(), scores);
        }

        let columns = header.ok_or_else(|| SequenceError::MatrixParse {
            line: 0,
            reason: "no header row".into(),
        })?;
        let column_of = |ch: char| {
            columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(&ch))
                .ok_or_else(|| SequenceError::MatrixParse {
                    line: 0,
                    reason: format!("column {ch:?} missing from header"),
                })
        };

        let mut scores = Vec::with_capacity(alphabet.len());
        for &row_char in alphabet.chars() {
            let row = rows.get(&row_char).ok_or_else(|| SequenceError::MatrixParse {
                line: 0,
                reason: format!("row {row_char:?} missing"),
            })?;
            let mut out = Vec::with_capacity(alphabet.len());
            for &col_char in alphabet.chars() {
                out.push(row[column_of(col_char)?]);
            }
            scores.push(out);
        }
        Self::from_similarity_scores(name, alphabet, &scores)
    }

    /// BLOSUM62 over the twenty-letter protein alphabet.
    pub fn blosum62() -> Self {
        Self::parse_ncbi("blosum62", BLOSUM62, Alphabet::protein())
            .expect("embedded BLOSUM62 table is well formed")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Symbol space size including the default symbol.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Largest cost in the table; also the cost of any pair with the default symbol.
    pub fn max_cost(&self) -> Distance {
        self.max_cost
    }

    #[inline]
    pub fn cost(&self, a: Symbol, b: Symbol) -> Distance {
        self.costs[a as usize * self.dim + b as usize]
    }

    /// Flat `dim × dim` table, row-major by first symbol.
    pub fn cost_table(&self) -> &[Distance] {
        &self.costs
    }

    /// Flat `dim² × dim²` digram table, if the alphabet is small enough.
    pub fn digram_table(&self) -> Option<&[Distance]> {
        self.digram_costs.as_deref()
    }

    pub fn has_digram_table(&self) -> bool {
        self.digram_costs.is_some()
    }

    /// Cost of a digram pair. `None` when no digram table was built.
    #[inline]
    pub fn digram_cost(&self, a: Digram, b: Digram) -> Option<Distance> {
        let dd = self.dim * self.dim;
        self.digram_costs
            .as_ref()
            .map(|table| table[a as usize * dd + b as usize])
    }

    /// Sum of pairwise costs of two equally long symbol windows.
    #[inline]
    pub fn window_distance(&self, a: &[Symbol], b: &[Symbol]) -> Distance {
        debug_assert_eq!(a.len(), b.len());
        a.iter().zip(b).map(|(&x, &y)| self.cost(x, y)).sum()
    }

    /// Rows of the declared characters, without the default symbol.
    pub fn declared_costs(&self) -> Vec<Vec<Distance>> {
        (1..self.dim)
            .map(|i| {
                (1..self.dim)
                    .map(|j| self.costs[i * self.dim + j])
                    .collect()
            })
            .collect()
    }
}

fn single_char(token: &str) -> Result<char, String> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(format!("expected a single character, got {token:?}")),
    }
}

fn build_digram_table(costs: &[Distance], dim: usize) -> Option<Arc<[Distance]>> {
    let dd = dim * dim;
    if dd * dd > DIGRAM_TABLE_LIMIT {
        tracing::debug!(dim, "alphabet too large for a digram table");
        return None;
    }
    let mut table = Vec::with_capacity(dd * dd);
    for x in 0..dd {
        let (a, b) = (x / dim, x % dim);
        for y in 0..dd {
            let (c, d) = (y / dim, y % dim);
            table.push(costs[a * dim + c] + costs[b * dim + d]);
        }
    }
    Some(table.into())
}

impl fmt::Debug for SimilarityMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimilarityMatrix")
            .field("name", &self.name)
            .field("alphabet", &self.alphabet)
            .field("max_cost", &self.max_cost)
            .field("digrams", &self.digram_costs.is_some())
            .finish()
    }
}

impl TryFrom<MatrixRecord> for SimilarityMatrix {
    type Error = SequenceError;

    fn try_from(value: MatrixRecord) -> Result<Self, Self::Error> {
        SimilarityMatrix::from_costs(value.name, value.alphabet, value.costs)
    }
}

impl From<SimilarityMatrix> for MatrixRecord {
    fn from(value: SimilarityMatrix) -> Self {
        MatrixRecord {
            costs: value.declared_costs(),
            name: value.name,
            alphabet: value.alphabet,
        }
    }
}

/// Whether a symbol is the padding value.
#[inline]
pub fn is_default(symbol: Symbol) -> bool {
    symbol == DEFAULT_SYMBOL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_mismatch_costs() {
        let m = SimilarityMatrix::match_mismatch(Alphabet::dna(), 0, 1);
        let a = m.alphabet().encode('a');
        let c = m.alphabet().encode('c');
        assert_eq!(m.cost(a, a), 0);
        assert_eq!(m.cost(a, c), 1);
        assert_eq!(m.cost(DEFAULT_SYMBOL, a), 1);
        assert_eq!(m.cost(a, DEFAULT_SYMBOL), 1);
        assert_eq!(m.max_cost(), 1);
    }

    #[test]
    fn rejects_wrong_shape() {
        let err = SimilarityMatrix::from_costs("bad", Alphabet::dna(), vec![vec![0; 4]; 3])
            .expect_err("shape mismatch");
        assert!(matches!(err, SequenceError::MatrixShape { expected: 4, .. }));

        let err = SimilarityMatrix::from_costs(
            "bad",
            Alphabet::dna(),
            vec![vec![0; 4], vec![0; 4], vec![0; 3], vec![0; 4]],
        )
        .expect_err("ragged rows");
        assert!(matches!(err, SequenceError::MatrixShape { cols: 3, .. }));
    }

    #[test]
    fn digram_table_sums_pair_costs() {
        let m = SimilarityMatrix::match_mismatch(Alphabet::dna(), 0, 1);
        let alphabet = m.alphabet();
        let ac = alphabet.digram(1, 2);
        let ag = alphabet.digram(1, 3);
        let tg = alphabet.digram(4, 3);
        assert_eq!(m.digram_cost(ac, ac), Some(0));
        assert_eq!(m.digram_cost(ac, ag), Some(1));
        assert_eq!(m.digram_cost(ac, tg), Some(2));
    }

    #[test]
    fn blosum62_costs_are_symmetric_and_zero_on_diagonal() {
        let m = SimilarityMatrix::blosum62();
        let n = m.alphabet().len() as Symbol;
        for a in 1..=n {
            assert_eq!(m.cost(a, a), 0);
            for b in 1..=n {
                assert_eq!(m.cost(a, b), m.cost(b, a));
                assert!(m.cost(a, b) >= 0);
            }
        }
        let alphabet = m.alphabet();
        // s(W,W)=11, s(C,C)=9, s(W,C)=-2
        assert_eq!(m.cost(alphabet.encode('w'), alphabet.encode('c')), 24);
        assert!(m.has_digram_table());
    }

    #[test]
    fn parse_ncbi_reports_bad_rows() {
        let text = "  A C\nA 1 0\nC 0\n";
        let err = SimilarityMatrix::parse_ncbi("x", text, Alphabet::new("ac").unwrap())
            .expect_err("short row");
        assert!(matches!(err, SequenceError::MatrixParse { line: 3, .. }));

        let text = "  A C\nA 1 0\n";
        let err = SimilarityMatrix::parse_ncbi("x", text, Alphabet::new("ac").unwrap())
            .expect_err("missing row");
        assert!(matches!(err, SequenceError::MatrixParse { line: 0, .. }));
    }

    #[test]
    fn serde_roundtrip_rebuilds_tables() {
        let m = SimilarityMatrix::blosum62();
        let json = serde_json::to_string(&m).unwrap();
        let back: SimilarityMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.digram_table(), m.digram_table());
    }

    #[test]
    fn window_distance_sums_costs() {
        let m = SimilarityMatrix::match_mismatch(Alphabet::dna(), 0, 1);
        let a = m.alphabet().encode_str("acgt");
        let b = m.alphabet().encode_str("acct");
        assert_eq!(m.window_distance(&a, &b), 1);
        assert_eq!(m.window_distance(&a, &a), 0);
    }
}
