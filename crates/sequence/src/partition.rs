//! Training/test split and class posting lists.

use serde::{Deserialize, Serialize};

use crate::database::SequenceDatabase;
use crate::error::SequenceError;

/// Disjoint, sorted subsets of database indices.
///
/// The training set is what gets clustered, indexed and searched; the test
/// set supplies the queries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Partition {
    training: Vec<usize>,
    test: Vec<usize>,
}

impl Partition {
    /// Shuffle `0..n` with `seed` and put `round(n * test_fraction)` indices in
    /// the test set.
    pub fn split(n: usize, test_fraction: f64, seed: u64) -> Result<Self, SequenceError> {
        if !(0.0..=1.0).contains(&test_fraction) {
            return Err(SequenceError::InvalidFraction {
                fraction: test_fraction,
            });
        }
        let mut order: Vec<usize> = (0..n).collect();
        fastrand::Rng::with_seed(seed).shuffle(&mut order);

        let test_len = ((n as f64) * test_fraction).round() as usize;
        let mut test = order[..test_len].to_vec();
        let mut training = order[test_len..].to_vec();
        test.sort_unstable();
        training.sort_unstable();
        Ok(Self { training, test })
    }

    /// Every sequence is both searchable and a query.
    pub fn all(n: usize) -> Self {
        Self {
            training: (0..n).collect(),
            test: (0..n).collect(),
        }
    }

    /// Explicit subsets. Each is sorted and deduplicated; indices must be `< n`.
    pub fn from_subsets(
        n: usize,
        mut training: Vec<usize>,
        mut test: Vec<usize>,
    ) -> Result<Self, SequenceError> {
        for &index in training.iter().chain(&test) {
            if index >= n {
                return Err(SequenceError::IndexOutOfRange { index, len: n });
            }
        }
        training.sort_unstable();
        training.dedup();
        test.sort_unstable();
        test.dedup();
        Ok(Self { training, test })
    }

    pub fn training(&self) -> &[usize] {
        &self.training
    }

    pub fn test(&self) -> &[usize] {
        &self.test
    }
}

/// Class id → database indices of the subset members carrying that class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassPostingList {
    postings: Vec<Vec<u32>>,
}

impl ClassPostingList {
    pub fn build(db: &SequenceDatabase, subset: &[usize]) -> Self {
        let mut postings = vec![Vec::new(); db.class_count()];
        for &index in subset {
            let Some(sequence) = db.get(index) else {
                continue;
            };
            for &class in sequence.classes() {
                postings[class as usize].push(index as u32);
            }
        }
        Self { postings }
    }

    /// Members of `class`; empty for unknown classes.
    pub fn members(&self, class: u32) -> &[u32] {
        self.postings
            .get(class as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn class_count(&self) -> usize {
        self.postings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Alphabet, FieldLayout};

    #[test]
    fn split_is_disjoint_and_deterministic() {
        let a = Partition::split(100, 0.2, 7).unwrap();
        let b = Partition::split(100, 0.2, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.test().len(), 20);
        assert_eq!(a.training().len(), 80);
        assert!(a.test().windows(2).all(|w| w[0] < w[1]));
        assert!(a.test().iter().all(|t| a.training().binary_search(t).is_err()));
    }

    #[test]
    fn split_rejects_bad_fraction() {
        assert!(matches!(
            Partition::split(10, 1.5, 0),
            Err(SequenceError::InvalidFraction { .. })
        ));
        assert!(Partition::split(10, f64::NAN, 0).is_err());
        assert_eq!(Partition::split(10, 0.0, 0).unwrap().test().len(), 0);
    }

    #[test]
    fn from_subsets_checks_range() {
        let p = Partition::from_subsets(5, vec![3, 1, 1], vec![4]).unwrap();
        assert_eq!(p.training(), &[1, 3]);
        assert!(Partition::from_subsets(5, vec![5], vec![]).is_err());
    }

    #[test]
    fn class_postings_cover_subset_only() {
        let text = ">a|x\nac\n>b|x;y\nac\n>c|y\nac\n";
        let layout = FieldLayout::new().with_class_field(Some(1));
        let db = SequenceDatabase::from_fasta_str(text, Alphabet::dna(), layout).unwrap();
        let postings = ClassPostingList::build(&db, &[0, 1]);
        let x = db.class_id("x").unwrap();
        let y = db.class_id("y").unwrap();
        assert_eq!(postings.members(x), &[0, 1]);
        assert_eq!(postings.members(y), &[1]);
        assert!(postings.members(99).is_empty());
    }
}
