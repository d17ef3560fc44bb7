use signature::SparseSignature;

use crate::IndexError;

/// Feature id → ascending sequence indices whose signature contains it.
///
/// Built from one snapshot of signatures; rebuild whenever they change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    postings: Vec<Vec<u32>>,
    documents: usize,
}

impl PostingList {
    /// Index the signatures listed in `subset` in one pass.
    ///
    /// Posting order follows `subset` order, so a sorted subset gives sorted
    /// postings.
    pub fn build(
        signatures: &[SparseSignature],
        subset: &[usize],
        vocabulary_size: usize,
    ) -> Result<Self, IndexError> {
        let mut postings = vec![Vec::new(); vocabulary_size];
        for &index in subset {
            let signature = signatures.get(index).ok_or(IndexError::SequenceOutOfRange {
                index,
                len: signatures.len(),
            })?;
            for &feature in signature.ids() {
                let slot = postings
                    .get_mut(feature as usize)
                    .ok_or(IndexError::FeatureOutOfRange {
                        sequence: index,
                        feature,
                        vocabulary_size,
                    })?;
                slot.push(index as u32);
            }
        }
        log::debug!(
            "posting list built: {} documents, {} features",
            subset.len(),
            vocabulary_size
        );
        Ok(Self {
            postings,
            documents: subset.len(),
        })
    }

    /// Sequences carrying `feature`; empty for unknown features.
    pub fn get(&self, feature: u32) -> &[u32] {
        self.postings
            .get(feature as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn feature_count(&self) -> usize {
        self.postings.len()
    }

    /// Number of indexed sequences.
    pub fn documents(&self) -> usize {
        self.documents
    }
}
