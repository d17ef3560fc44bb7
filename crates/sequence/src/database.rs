//! FASTA-backed sequence database.
//!
//! Headers are split into fields on [`FieldLayout::separator`]. One field holds
//! the unique sequence id, an optional field holds a class label list and an
//! optional field holds a display name. Ids and class labels are interned in
//! tables owned by the database.

use std::fs;
use std::path::Path;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::alphabet::Alphabet;
use crate::error::SequenceError;
use crate::sequence::{KmerInstance, KmerView, Sequence};

/// String ↔ dense id table.
#[derive(Debug, Clone, Default)]
pub struct Interner {
    names: Vec<String>,
    lookup: HashMap<String, u32>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, allocating one on first sight.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.lookup.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_owned());
        self.lookup.insert(name.to_owned(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.lookup.get(name).copied()
    }

    pub fn resolve(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.lookup.clear();
    }
}

/// Which header fields carry the id, class list and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLayout {
    pub separator: char,
    pub id_field: usize,
    pub class_field: Option<usize>,
    pub name_field: Option<usize>,
    pub class_separator: char,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            separator: '|',
            id_field: 0,
            class_field: None,
            name_field: None,
            class_separator: ';',
        }
    }
}

impl FieldLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_id_field(mut self, field: usize) -> Self {
        self.id_field = field;
        self
    }

    pub fn with_class_field(mut self, field: Option<usize>) -> Self {
        self.class_field = field;
        self
    }

    pub fn with_name_field(mut self, field: Option<usize>) -> Self {
        self.name_field = field;
        self
    }

    pub fn with_class_separator(mut self, separator: char) -> Self {
        self.class_separator = separator;
        self
    }

    pub fn validate(&self) -> Result<(), SequenceError> {
        if self.class_field.is_some() && self.class_separator == self.separator {
            return Err(SequenceError::InvalidLayout(format!(
                "class separator {:?} must differ from field separator",
                self.class_separator
            )));
        }
        if self.class_field == Some(self.id_field) {
            return Err(SequenceError::InvalidLayout(
                "class field must differ from id field".into(),
            ));
        }
        Ok(())
    }

    fn split<'a>(&self, header: &'a str) -> Vec<&'a str> {
        header.split(self.separator).map(str::trim).collect()
    }
}

/// All sequences of one run, with their id and class tables.
#[derive(Debug, Clone)]
pub struct SequenceDatabase {
    alphabet: Alphabet,
    layout: FieldLayout,
    sequences: Vec<Sequence>,
    ids: Interner,
    classes: Interner,
}

impl SequenceDatabase {
    pub fn new(alphabet: Alphabet, layout: FieldLayout) -> Result<Self, SequenceError> {
        layout.validate()?;
        Ok(Self {
            alphabet,
            layout,
            sequences: Vec::new(),
            ids: Interner::new(),
            classes: Interner::new(),
        })
    }

    /// Parse FASTA text. Residue lines are concatenated with whitespace removed.
    pub fn from_fasta_str(
        text: &str,
        alphabet: Alphabet,
        layout: FieldLayout,
    ) -> Result<Self, SequenceError> {
        let mut db = Self::new(alphabet, layout)?;
        let mut header: Option<&str> = None;
        let mut residues = String::new();

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim_end();
            if let Some(next) = line.strip_prefix('>') {
                if let Some(prev) = header.replace(next) {
                    db.push_record(prev, &residues)?;
                }
                residues.clear();
            } else if line.starts_with(';') || line.trim().is_empty() {
                continue;
            } else if header.is_none() {
                return Err(SequenceError::OrphanResidues { line: line_no + 1 });
            } else {
                residues.extend(line.chars().filter(|c| !c.is_whitespace()));
            }
        }
        if let Some(prev) = header {
            db.push_record(prev, &residues)?;
        }

        info!(
            sequences = db.len(),
            classes = db.class_count(),
            "sequence database loaded"
        );
        Ok(db)
    }

    pub fn from_fasta_file(
        path: impl AsRef<Path>,
        alphabet: Alphabet,
        layout: FieldLayout,
    ) -> Result<Self, SequenceError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading fasta");
        let text = fs::read_to_string(path)?;
        Self::from_fasta_str(&text, alphabet, layout)
    }

    /// Append one record and return its database index.
    pub fn push_record(&mut self, header: &str, residues: &str) -> Result<usize, SequenceError> {
        let index = self.sequences.len();
        let fields = self.layout.split(header);
        let id = fields
            .get(self.layout.id_field)
            .copied()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SequenceError::MissingField {
                record: index,
                field: self.layout.id_field,
                header: header.to_owned(),
            })?;
        if self.ids.get(id).is_some() {
            return Err(SequenceError::DuplicateId { id: id.to_owned() });
        }
        self.ids.intern(id);

        let metadata = fields.iter().map(|f| (*f).to_owned()).collect();
        let mut sequence = Sequence::new(id, metadata, residues, &self.alphabet);
        self.apply_layout(&mut sequence);
        self.sequences.push(sequence);
        Ok(index)
    }

    /// Point class and name at different header fields and recompute every
    /// sequence's class set. Class ids are reassigned from scratch.
    pub fn reassign_fields(
        &mut self,
        class_field: Option<usize>,
        name_field: Option<usize>,
    ) -> Result<(), SequenceError> {
        let layout = self
            .layout
            .clone()
            .with_class_field(class_field)
            .with_name_field(name_field);
        layout.validate()?;
        self.layout = layout;
        self.classes.clear();

        let mut sequences = std::mem::take(&mut self.sequences);
        for sequence in &mut sequences {
            self.apply_layout(sequence);
        }
        self.sequences = sequences;
        debug!(classes = self.classes.len(), "class fields reassigned");
        Ok(())
    }

    fn apply_layout(&mut self, sequence: &mut Sequence) {
        let classes = match self
            .layout
            .class_field
            .and_then(|field| sequence.metadata().get(field))
        {
            Some(list) => list
                .split(self.layout.class_separator)
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(|label| self.classes.intern(label))
                .collect(),
            None => Vec::new(),
        };
        let name = self
            .layout
            .name_field
            .and_then(|field| sequence.metadata().get(field))
            .filter(|name| !name.is_empty())
            .cloned();
        sequence.set_classes(classes);
        sequence.set_name(name);
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Database index of the sequence with unique id `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ids.get(id).map(|i| i as usize)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class_name(&self, class: u32) -> Option<&str> {
        self.classes.resolve(class)
    }

    pub fn class_id(&self, name: &str) -> Option<u32> {
        self.classes.get(name)
    }

    /// Borrow the k-mer an instance points at.
    pub fn kmer(&self, instance: KmerInstance, k: usize) -> Option<KmerView<'_>> {
        self.sequences
            .get(instance.sequence as usize)?
            .kmer(instance.offset as usize, k)
    }

    /// Every k-mer instance of the listed sequences, in subset then offset order.
    pub fn kmer_population(
        &self,
        subset: &[usize],
        k: usize,
    ) -> Result<Vec<KmerInstance>, SequenceError> {
        let mut total = 0usize;
        for &index in subset {
            let sequence = self.sequences.get(index).ok_or(SequenceError::IndexOutOfRange {
                index,
                len: self.sequences.len(),
            })?;
            total += sequence.kmer_count(k);
        }

        let mut population = Vec::with_capacity(total);
        for &index in subset {
            let count = self.sequences[index].kmer_count(k);
            population.extend((0..count).map(|offset| KmerInstance::new(index as u32, offset as u32)));
        }
        Ok(population)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FASTA: &str = "\
>s1|alpha;beta|first
ACGT
AC
>s2|beta|second
acgg
; comment line

>s3||third
TTTT
";

    fn layout() -> FieldLayout {
        FieldLayout::new()
            .with_class_field(Some(1))
            .with_name_field(Some(2))
    }

    #[test]
    fn loads_records_with_classes_and_names() {
        let db = SequenceDatabase::from_fasta_str(FASTA, Alphabet::dna(), layout()).unwrap();
        assert_eq!(db.len(), 3);
        assert_eq!(db.class_count(), 2);

        let s1 = db.get(0).unwrap();
        assert_eq!(s1.id(), "s1");
        assert_eq!(s1.name(), "first");
        assert_eq!(s1.len(), 6);
        assert_eq!(s1.classes().len(), 2);

        let beta = db.class_id("beta").unwrap();
        assert!(db.get(1).unwrap().has_class(beta));
        assert!(db.get(2).unwrap().classes().is_empty());
        assert_eq!(db.index_of("s3"), Some(2));
        assert_eq!(db.index_of("missing"), None);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let text = ">a\nac\n>a\ngt\n";
        let err = SequenceDatabase::from_fasta_str(text, Alphabet::dna(), FieldLayout::new())
            .unwrap_err();
        assert_eq!(err, SequenceError::DuplicateId { id: "a".into() });
    }

    #[test]
    fn residues_before_header_are_rejected() {
        let err = SequenceDatabase::from_fasta_str("acgt\n>a\nac\n", Alphabet::dna(), FieldLayout::new())
            .unwrap_err();
        assert_eq!(err, SequenceError::OrphanResidues { line: 1 });
    }

    #[test]
    fn missing_id_field_is_reported() {
        let layout = FieldLayout::new().with_id_field(3);
        let err = SequenceDatabase::from_fasta_str(">a|b\nac\n", Alphabet::dna(), layout).unwrap_err();
        assert!(matches!(err, SequenceError::MissingField { record: 0, field: 3, .. }));
    }

    #[test]
    fn reassign_fields_recomputes_classes() {
        let mut db = SequenceDatabase::from_fasta_str(FASTA, Alphabet::dna(), layout()).unwrap();
        db.reassign_fields(Some(2), None).unwrap();
        assert_eq!(db.class_count(), 3);
        let first = db.class_id("first").unwrap();
        assert_eq!(db.get(0).unwrap().classes(), &[first]);
        assert_eq!(db.get(0).unwrap().name(), "s1");

        db.reassign_fields(None, None).unwrap();
        assert_eq!(db.class_count(), 0);
        assert!(db.sequences().iter().all(|s| s.classes().is_empty()));
    }

    #[test]
    fn kmer_population_lists_every_window() {
        let db = SequenceDatabase::from_fasta_str(FASTA, Alphabet::dna(), layout()).unwrap();
        let population = db.kmer_population(&[1, 2], 3).unwrap();
        assert_eq!(population.len(), 4);
        assert_eq!(population[0], KmerInstance::new(1, 0));
        assert_eq!(population[3], KmerInstance::new(2, 1));
        assert!(db.kmer(population[3], 3).is_some());

        assert!(matches!(
            db.kmer_population(&[7], 3),
            Err(SequenceError::IndexOutOfRange { index: 7, len: 3 })
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.fa");
        std::fs::write(&path, FASTA).unwrap();
        let db = SequenceDatabase::from_fasta_file(&path, Alphabet::dna(), layout()).unwrap();
        assert_eq!(db.len(), 3);

        let err = SequenceDatabase::from_fasta_file(dir.path().join("nope.fa"), Alphabet::dna(), layout())
            .unwrap_err();
        assert!(matches!(err, SequenceError::Io(_)));
    }

    #[test]
    fn interner_round_trips() {
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        assert_eq!(interner.intern("a"), a);
        assert_eq!(interner.resolve(b), Some("b"));
        assert_eq!(interner.len(), 2);
    }
}
