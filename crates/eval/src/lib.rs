//! Ranking quality metrics.
//!
//! Precision is interpolated at `steps + 1` evenly spaced recall levels
//! `r_i = i / steps`: the value at `r_i` is the (smoothed) precision at the
//! first rank whose recall reaches `r_i`, or `0` if none does. A query's
//! average precision is the mean of its curve and MAP is the mean over
//! judged queries.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use index::Ranking;

/// Slack when comparing recall against a level.
const RECALL_EPSILON: f64 = 1e-12;

pub const DEFAULT_RECALL_STEPS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub recall_steps: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            recall_steps: DEFAULT_RECALL_STEPS,
        }
    }
}

impl EvalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recall_steps(mut self, steps: usize) -> Self {
        self.recall_steps = steps;
        self
    }

    pub fn validate(&self) -> Result<(), EvalError> {
        if self.recall_steps < 1 {
            return Err(EvalError::InvalidConfigSteps {
                steps: self.recall_steps,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("invalid config: recall_steps must be >= 1 (got {steps})")]
    InvalidConfigSteps { steps: usize },

    #[error("ranking for query {query} has {hits} hits but {precision} precision and {recall} recall values")]
    Misaligned {
        query: u32,
        hits: usize,
        precision: usize,
        recall: usize,
    },
}

/// Precision at recall levels `0, 1/steps, …, 1`.
pub fn interpolate_at_fixed_recall(precision: &[f64], recall: &[f64], steps: usize) -> Vec<f64> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let level = i as f64 / steps as f64;
            recall
                .iter()
                .position(|&r| r >= level - RECALL_EPSILON)
                .and_then(|pos| precision.get(pos).copied())
                .unwrap_or(0.0)
        })
        .collect()
}

/// Mean of an interpolated curve; `0` for an empty curve.
pub fn average_precision(curve: &[f64]) -> f64 {
    mean(curve)
}

/// Mean of per-query average precisions; `0` without queries.
pub fn mean_average_precision(average_precisions: &[f64]) -> f64 {
    mean(average_precisions)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryScore {
    pub query: u32,
    pub average_precision: f64,
}

/// Summary over a batch of rankings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    pub per_query: Vec<QueryScore>,
    pub map: f64,
    /// Element-wise mean of the judged queries' interpolated curves.
    pub curve: Vec<f64>,
    /// Rankings that carried no relevance judgement.
    pub skipped: usize,
}

/// Score every judged ranking. Unjudged rankings are counted in `skipped`.
pub fn evaluate(rankings: &[Ranking], cfg: &EvalConfig) -> Result<Evaluation, EvalError> {
    cfg.validate()?;
    let steps = cfg.recall_steps;
    let mut per_query = Vec::new();
    let mut curve = vec![0.0; steps + 1];
    let mut skipped = 0;

    for ranking in rankings {
        if !ranking.judged {
            skipped += 1;
            continue;
        }
        if ranking.precision.len() != ranking.hits.len() || ranking.recall.len() != ranking.hits.len() {
            return Err(EvalError::Misaligned {
                query: ranking.query,
                hits: ranking.hits.len(),
                precision: ranking.precision.len(),
                recall: ranking.recall.len(),
            });
        }
        let interpolated = interpolate_at_fixed_recall(&ranking.precision, &ranking.recall, steps);
        for (acc, value) in curve.iter_mut().zip(&interpolated) {
            *acc += value;
        }
        per_query.push(QueryScore {
            query: ranking.query,
            average_precision: average_precision(&interpolated),
        });
    }

    if !per_query.is_empty() {
        let n = per_query.len() as f64;
        curve.iter_mut().for_each(|v| *v /= n);
    }
    let aps: Vec<f64> = per_query.iter().map(|q| q.average_precision).collect();
    let map = mean_average_precision(&aps);
    info!(
        queries = per_query.len(),
        skipped,
        map,
        "rankings evaluated"
    );
    Ok(Evaluation {
        per_query,
        map,
        curve,
        skipped,
    })
}
