use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::SignatureError;

/// Strictly increasing feature ids with optional per-id weights.
///
/// Set operations walk both id lists once. Missing weights count as `1`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SparseSignature {
    ids: Vec<u32>,
    weights: Option<Vec<u32>>,
}

impl SparseSignature {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate an already sorted id list and its optional weights.
    pub fn from_sorted_ids(ids: Vec<u32>, weights: Option<Vec<u32>>) -> Result<Self, SignatureError> {
        if let Some(position) = ids.windows(2).position(|w| w[0] >= w[1]) {
            return Err(SignatureError::NotIncreasing {
                position: position + 1,
            });
        }
        if let Some(w) = &weights {
            if w.len() != ids.len() {
                return Err(SignatureError::WeightLength {
                    ids: ids.len(),
                    weights: w.len(),
                });
            }
        }
        Ok(Self { ids, weights })
    }

    pub(crate) fn from_parts_unchecked(ids: Vec<u32>, weights: Option<Vec<u32>>) -> Self {
        debug_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        Self { ids, weights }
    }

    /// Sort and deduplicate arbitrary ids into a presence signature.
    pub fn from_ids(mut ids: Vec<u32>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self { ids, weights: None }
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn weights(&self) -> Option<&[u32]> {
        self.weights.as_deref()
    }

    /// Weight at position `i` of the id list.
    #[inline]
    pub fn weight_at(&self, i: usize) -> u32 {
        self.weights.as_ref().map_or(1, |w| w[i])
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn max_id(&self) -> Option<u32> {
        self.ids.last().copied()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    fn merge(&self, other: &Self, mut on_common: impl FnMut(usize, usize)) -> usize {
        let (a, b) = (&self.ids, &other.ids);
        let (mut i, mut j) = (0, 0);
        let mut common = 0;
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    on_common(i, j);
                    common += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        common
    }

    pub fn intersection_size(&self, other: &Self) -> usize {
        self.merge(other, |_, _| {})
    }

    pub fn union_size(&self, other: &Self) -> usize {
        self.len() + other.len() - self.intersection_size(other)
    }

    /// Weighted dot product over shared ids.
    pub fn dot(&self, other: &Self) -> u64 {
        let mut sum = 0u64;
        self.merge(other, |i, j| {
            sum += self.weight_at(i) as u64 * other.weight_at(j) as u64;
        });
        sum
    }

    /// `|A ∩ B| / |A ∪ B|`, `0` when both are empty.
    pub fn jaccard(&self, other: &Self) -> f64 {
        let union = self.union_size(other);
        if union == 0 {
            return 0.0;
        }
        self.intersection_size(other) as f64 / union as f64
    }

    /// Weighted cosine similarity, `0` when either side is empty.
    pub fn cosine(&self, other: &Self) -> f64 {
        let norm = (self.squared_norm() as f64).sqrt() * (other.squared_norm() as f64).sqrt();
        if norm == 0.0 {
            return 0.0;
        }
        self.dot(other) as f64 / norm
    }

    fn squared_norm(&self) -> u64 {
        (0..self.len())
            .map(|i| {
                let w = self.weight_at(i) as u64;
                w * w
            })
            .sum()
    }
}
