use roaring::RoaringBitmap;

use sequence::{ClassPostingList, SequenceDatabase};

use crate::Ranking;

/// Attaches precision/recall arrays to rankings using class labels.
///
/// A hit is relevant when it shares at least one class with the query. The
/// relevant total counts distinct searchable sequences sharing a class with
/// the query, deduplicated through a bitmap.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceJudge<'a> {
    db: &'a SequenceDatabase,
    classes: &'a ClassPostingList,
    exclude_self: bool,
}

impl<'a> RelevanceJudge<'a> {
    /// `classes` must be built over the searchable subset.
    pub fn new(db: &'a SequenceDatabase, classes: &'a ClassPostingList, exclude_self: bool) -> Self {
        Self {
            db,
            classes,
            exclude_self,
        }
    }

    /// Fill `ranking.precision` and `ranking.recall`. Returns `false` and
    /// leaves the ranking untouched when the query has no class labels.
    pub fn attach(&self, ranking: &mut Ranking) -> bool {
        let Some(query) = self.db.get(ranking.query as usize) else {
            return false;
        };
        if query.classes().is_empty() {
            return false;
        }

        let mut relevant_set = RoaringBitmap::new();
        for &class in query.classes() {
            relevant_set.extend(self.classes.members(class).iter().copied());
        }
        if self.exclude_self {
            relevant_set.remove(ranking.query);
        }
        let total = relevant_set.len();

        let mut precision = Vec::with_capacity(ranking.hits.len());
        let mut recall = Vec::with_capacity(ranking.hits.len());
        let mut relevant = 0u64;
        for (i, hit) in ranking.hits.iter().enumerate() {
            let shares_class = self
                .db
                .get(hit.candidate as usize)
                .is_some_and(|c| c.classes().iter().any(|&class| query.has_class(class)));
            if shares_class {
                relevant += 1;
            }
            precision.push(relevant as f64 / (i + 1) as f64);
            recall.push(if total == 0 {
                1.0
            } else {
                relevant as f64 / total as f64
            });
        }
        smooth_backward(&mut precision);

        ranking.precision = precision;
        ranking.recall = recall;
        ranking.judged = true;
        true
    }

    /// Attach relevance to every ranking; returns how many were skipped.
    pub fn attach_all(&self, rankings: &mut [Ranking]) -> usize {
        let mut skipped = 0;
        for ranking in rankings.iter_mut() {
            if !self.attach(ranking) {
                skipped += 1;
            }
        }
        if skipped > 0 {
            log::debug!("{skipped} queries have no class labels");
        }
        skipped
    }
}

/// `p[j] = max(p[j], p[j + 1])` from the back, making precision non-increasing.
pub fn smooth_backward(precision: &mut [f64]) {
    for j in (0..precision.len().saturating_sub(1)).rev() {
        if precision[j + 1] > precision[j] {
            precision[j] = precision[j + 1];
        }
    }
}
