//! Character ↔ symbol mapping.
//!
//! Symbols are dense small integers. Code `0` is reserved for
//! [`DEFAULT_SYMBOL`], which stands for padding and for any character outside
//! the alphabet; alphabet characters are numbered from `1` in the order they
//! were declared. Encoding is case-insensitive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SequenceError;

/// Encoded alphabet character.
pub type Symbol = u8;

/// Encoded pair of adjacent symbols, `first * dim + second`.
pub type Digram = u16;

/// Padding / unknown symbol.
pub const DEFAULT_SYMBOL: Symbol = 0;

/// Character returned when decoding [`DEFAULT_SYMBOL`].
pub const DEFAULT_CHAR: char = '?';

/// Largest supported alphabet. Keeps `dim * dim` within a [`Digram`].
pub const MAX_ALPHABET_LEN: usize = 64;

/// Nucleotide alphabet.
pub const DNA_CHARS: &str = "acgt";

/// The twenty standard amino acids, in NCBI matrix order.
pub const PROTEIN_CHARS: &str = "arndcqeghilkmfpstwyv";

/// Ordered set of ASCII characters with a lookup table for encoding.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alphabet {
    chars: Vec<char>,
    lut: [Symbol; 128],
}

impl Alphabet {
    /// Build an alphabet from its characters in symbol order.
    pub fn new(chars: &str) -> Result<Self, SequenceError> {
        if chars.is_empty() {
            return Err(SequenceError::InvalidAlphabet {
                reason: "alphabet must not be empty".into(),
            });
        }
        let declared: Vec<char> = chars.chars().collect();
        if declared.len() > MAX_ALPHABET_LEN {
            return Err(SequenceError::InvalidAlphabet {
                reason: format!(
                    "alphabet has {} characters, at most {MAX_ALPHABET_LEN} supported",
                    declared.len()
                ),
            });
        }

        let mut lut = [DEFAULT_SYMBOL; 128];
        let mut normalized = Vec::with_capacity(declared.len());
        for (idx, &ch) in declared.iter().enumerate() {
            if !ch.is_ascii_graphic() || ch == DEFAULT_CHAR {
                return Err(SequenceError::InvalidAlphabet {
                    reason: format!("character {ch:?} is not allowed in an alphabet"),
                });
            }
            let lower = ch.to_ascii_lowercase();
            let upper = ch.to_ascii_uppercase();
            if lut[lower as usize] != DEFAULT_SYMBOL {
                return Err(SequenceError::InvalidAlphabet {
                    reason: format!("character {ch:?} declared twice"),
                });
            }
            let symbol = (idx + 1) as Symbol;
            lut[lower as usize] = symbol;
            lut[upper as usize] = symbol;
            normalized.push(lower);
        }

        Ok(Self {
            chars: normalized,
            lut,
        })
    }

    /// Nucleotide alphabet `acgt`.
    pub fn dna() -> Self {
        Self::new(DNA_CHARS).expect("built-in DNA alphabet is valid")
    }

    /// Standard twenty-letter amino acid alphabet.
    pub fn protein() -> Self {
        Self::new(PROTEIN_CHARS).expect("built-in protein alphabet is valid")
    }

    /// Number of declared characters (excluding the default symbol).
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Size of the symbol space including [`DEFAULT_SYMBOL`].
    pub fn dim(&self) -> usize {
        self.chars.len() + 1
    }

    /// Declared characters in symbol order (lower case).
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Map a character to its symbol; unknown characters map to [`DEFAULT_SYMBOL`].
    #[inline]
    pub fn encode(&self, ch: char) -> Symbol {
        if ch.is_ascii() {
            self.lut[ch as usize]
        } else {
            DEFAULT_SYMBOL
        }
    }

    /// Map a symbol back to its (lower case) character.
    #[inline]
    pub fn decode(&self, symbol: Symbol) -> char {
        match symbol as usize {
            0 => DEFAULT_CHAR,
            s if s <= self.chars.len() => self.chars[s - 1],
            _ => DEFAULT_CHAR,
        }
    }

    /// Whether `ch` belongs to the alphabet.
    pub fn contains(&self, ch: char) -> bool {
        self.encode(ch) != DEFAULT_SYMBOL
    }

    pub fn encode_str(&self, text: &str) -> Vec<Symbol> {
        let mut out = Vec::with_capacity(text.len());
        out.extend(text.chars().map(|ch| self.encode(ch)));
        out
    }

    pub fn decode_symbols(&self, symbols: &[Symbol]) -> String {
        symbols.iter().map(|&s| self.decode(s)).collect()
    }

    /// Pack two adjacent symbols into a digram.
    #[inline]
    pub fn digram(&self, first: Symbol, second: Symbol) -> Digram {
        first as Digram * self.dim() as Digram + second as Digram
    }

    /// Number of distinct digram codes.
    pub fn digram_count(&self) -> usize {
        self.dim() * self.dim()
    }

    /// Digram encoding of a symbol run: `out[i] = digram(s[i], s[i + 1])`.
    pub fn digrams(&self, symbols: &[Symbol]) -> Vec<Digram> {
        let mut out = Vec::with_capacity(symbols.len().saturating_sub(1));
        out.extend(symbols.windows(2).map(|w| self.digram(w[0], w[1])));
        out
    }
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Alphabet")
            .field(&self.chars.iter().collect::<String>())
            .finish()
    }
}

impl TryFrom<String> for Alphabet {
    type Error = SequenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Alphabet::new(&value)
    }
}

impl From<Alphabet> for String {
    fn from(value: Alphabet) -> Self {
        value.chars.iter().collect()
    }
}
