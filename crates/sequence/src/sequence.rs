//! Encoded sequences and k-mer views.

use serde::{Deserialize, Serialize};

use crate::alphabet::{Alphabet, Digram, Symbol};

/// One loaded sequence: header metadata plus its symbol and digram encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    id: String,
    name: Option<String>,
    metadata: Vec<String>,
    classes: Vec<u32>,
    symbols: Vec<Symbol>,
    digrams: Vec<Digram>,
}

impl Sequence {
    /// Encode `residues` with `alphabet`. Class ids must already be interned.
    pub fn new(
        id: impl Into<String>,
        metadata: Vec<String>,
        residues: &str,
        alphabet: &Alphabet,
    ) -> Self {
        let symbols = alphabet.encode_str(residues);
        let digrams = alphabet.digrams(&symbols);
        Self {
            id: id.into(),
            name: None,
            metadata,
            classes: Vec::new(),
            symbols,
            digrams,
        }
    }

    /// Unique id taken from the header.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, falling back to the id.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Raw header fields.
    pub fn metadata(&self) -> &[String] {
        &self.metadata
    }

    /// Sorted, deduplicated class ids.
    pub fn classes(&self) -> &[u32] {
        &self.classes
    }

    pub fn has_class(&self, class: u32) -> bool {
        self.classes.binary_search(&class).is_ok()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn digrams(&self) -> &[Digram] {
        &self.digrams
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Number of k-length windows, `max(0, len - k + 1)`. Zero for `k == 0`.
    pub fn kmer_count(&self, k: usize) -> usize {
        if k == 0 {
            return 0;
        }
        (self.symbols.len() + 1).saturating_sub(k)
    }

    /// Borrow the k-mer starting at `offset`.
    pub fn kmer(&self, offset: usize, k: usize) -> Option<KmerView<'_>> {
        if k == 0 || offset + k > self.symbols.len() {
            return None;
        }
        Some(KmerView {
            symbols: &self.symbols[offset..offset + k],
            digrams: &self.digrams[offset..offset + k - 1],
        })
    }

    pub(crate) fn set_classes(&mut self, mut classes: Vec<u32>) {
        classes.sort_unstable();
        classes.dedup();
        self.classes = classes;
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }
}

/// Borrowed k-length window with its `k - 1` digrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerView<'a> {
    pub symbols: &'a [Symbol],
    pub digrams: &'a [Digram],
}

impl KmerView<'_> {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn to_owned_kmer(&self) -> Kmer {
        Kmer {
            symbols: self.symbols.to_vec(),
            digrams: self.digrams.to_vec(),
        }
    }
}

/// Owned copy of a k-mer, kept by prototypes so they outlive the database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Kmer {
    symbols: Vec<Symbol>,
    digrams: Vec<Digram>,
}

impl Kmer {
    pub fn from_symbols(symbols: Vec<Symbol>, alphabet: &Alphabet) -> Self {
        let digrams = alphabet.digrams(&symbols);
        Self { symbols, digrams }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn view(&self) -> KmerView<'_> {
        KmerView {
            symbols: &self.symbols,
            digrams: &self.digrams,
        }
    }
}

/// A k-mer location: database index of the sequence and zero-origin offset.
///
/// Ordering is by `(sequence, offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KmerInstance {
    pub sequence: u32,
    pub offset: u32,
}

impl KmerInstance {
    pub fn new(sequence: u32, offset: u32) -> Self {
        Self { sequence, offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dna(residues: &str) -> Sequence {
        Sequence::new("s", Vec::new(), residues, &Alphabet::dna())
    }

    #[test]
    fn kmer_count_handles_short_sequences() {
        let seq = dna("acgt");
        assert_eq!(seq.kmer_count(2), 3);
        assert_eq!(seq.kmer_count(4), 1);
        assert_eq!(seq.kmer_count(5), 0);
        assert_eq!(seq.kmer_count(0), 0);
        assert_eq!(dna("").kmer_count(1), 0);
    }

    #[test]
    fn digrams_are_one_shorter() {
        let seq = dna("acgt");
        assert_eq!(seq.digrams().len(), 3);
        assert!(dna("a").digrams().is_empty());
        assert!(dna("").digrams().is_empty());
    }

    #[test]
    fn kmer_view_slices_both_encodings() {
        let seq = dna("acgtac");
        let view = seq.kmer(2, 3).unwrap();
        assert_eq!(view.symbols, &[3, 4, 1]);
        assert_eq!(view.digrams.len(), 2);
        assert!(seq.kmer(4, 3).is_none());
        assert!(seq.kmer(0, 0).is_none());

        let owned = view.to_owned_kmer();
        assert_eq!(owned.view(), view);
        assert_eq!(Kmer::from_symbols(vec![3, 4, 1], &Alphabet::dna()), owned);
    }

    #[test]
    fn instances_order_by_sequence_then_offset() {
        let mut items = vec![
            KmerInstance::new(1, 0),
            KmerInstance::new(0, 5),
            KmerInstance::new(0, 2),
        ];
        items.sort();
        assert_eq!(
            items,
            vec![
                KmerInstance::new(0, 2),
                KmerInstance::new(0, 5),
                KmerInstance::new(1, 0)
            ]
        );
    }

    #[test]
    fn classes_are_sorted_and_unique() {
        let mut seq = dna("ac");
        seq.set_classes(vec![3, 1, 3]);
        assert_eq!(seq.classes(), &[1, 3]);
        assert!(seq.has_class(3));
        assert!(!seq.has_class(2));
        assert_eq!(seq.name(), "s");
    }
}
