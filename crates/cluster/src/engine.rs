//! Greedy threshold-covering clustering.
//!
//! The population is shuffled once and split into contiguous ranges, one per
//! worker. Each range owns a cursor: everything before it is allocated to some
//! prototype, everything after it is still free. An iteration picks the
//! instance at the cursor of the first non-empty range as the next prototype,
//! then every worker compacts its own range in parallel, swapping instances
//! within `threshold` of the prototype down to its cursor. The loop stops once
//! the requested coverage is reached.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use kernel::DiagonalDistanceEngine;
use sequence::{KmerInstance, KmerView, SequenceDatabase};

use crate::config::{ClusterConfig, ClusterError};
use crate::prototype::{Clustering, ClusteringStats, Prototype};
use crate::reinsert::reinsert;

/// Iterations between progress events.
const PROGRESS_EVERY: usize = 1024;

/// A worker's exclusive slice of the shuffled population.
struct WorkerRange<'a> {
    items: &'a mut [KmerInstance],
    cursor: usize,
    absorbed_from: usize,
}

impl WorkerRange<'_> {
    fn remaining(&self) -> usize {
        self.items.len() - self.cursor
    }

    /// Move every free instance accepted by `joins` down to the cursor.
    fn absorb(&mut self, joins: impl Fn(KmerInstance) -> bool) {
        self.absorbed_from = self.cursor;
        for i in self.cursor..self.items.len() {
            if joins(self.items[i]) {
                self.items.swap(i, self.cursor);
                self.cursor += 1;
            }
        }
    }

    fn last_absorbed(&self) -> &[KmerInstance] {
        &self.items[self.absorbed_from..self.cursor]
    }
}

/// Clusters k-mer populations with a fixed distance kernel and config.
#[derive(Debug, Clone)]
pub struct ClusteringEngine {
    kernel: DiagonalDistanceEngine,
    cfg: ClusterConfig,
}

impl ClusteringEngine {
    pub fn new(kernel: DiagonalDistanceEngine, cfg: ClusterConfig) -> Result<Self, ClusterError> {
        cfg.validate()?;
        Ok(Self { kernel, cfg })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.cfg
    }

    pub fn kernel(&self) -> &DiagonalDistanceEngine {
        &self.kernel
    }

    /// Cluster `population`, whose instances must all point at k-mers of `db`.
    ///
    /// An empty population yields an empty clustering.
    pub fn cluster(
        &self,
        db: &SequenceDatabase,
        population: &[KmerInstance],
    ) -> Result<Clustering, ClusterError> {
        let started = Instant::now();
        let k = self.cfg.kmer_length;
        let threshold = self.cfg.threshold;

        if let Some(&instance) = population.iter().find(|&&i| db.kmer(i, k).is_none()) {
            return Err(ClusterError::InstanceOutOfRange { instance, k });
        }
        let n = population.len();
        if n == 0 {
            return Ok(Clustering::empty(k, threshold));
        }

        let mut items = population.to_vec();
        fastrand::Rng::with_seed(self.cfg.seed).shuffle(&mut items);

        let workers = match self.cfg.workers {
            0 => rayon::current_num_threads(),
            w => w,
        }
        .clamp(1, n);
        let mut ranges: Vec<WorkerRange<'_>> = items
            .chunks_mut(n.div_ceil(workers))
            .map(|items| WorkerRange {
                items,
                cursor: 0,
                absorbed_from: 0,
            })
            .collect();

        // Stop once fewer than this many instances are left uncovered.
        let uncovered_floor = n as f64 - n as f64 * self.cfg.coverage / 100.0;
        let keep_members = self.cfg.keep_members && !self.cfg.reinsert;

        let mut found: Vec<(KmerInstance, usize)> = Vec::new();
        let mut members: Vec<Vec<KmerInstance>> = Vec::new();
        let mut previous_remaining = n;
        loop {
            let remaining: usize = ranges.iter().map(WorkerRange::remaining).sum();
            if let Some(last) = found.last_mut() {
                last.1 = previous_remaining - remaining;
            }
            previous_remaining = remaining;
            if remaining == 0 || (remaining as f64) < uncovered_floor {
                break;
            }

            let Some(range) = ranges.iter_mut().find(|r| r.remaining() > 0) else {
                break;
            };
            let centroid = range.items[range.cursor];
            range.cursor += 1;
            found.push((centroid, 0));

            let Some(center) = db.kmer(centroid, k) else {
                return Err(ClusterError::InstanceOutOfRange {
                    instance: centroid,
                    k,
                });
            };
            ranges.par_iter_mut().for_each(|range| {
                range.absorb(|instance| self.joins(db, instance, center));
            });

            if keep_members {
                let mut cluster = vec![centroid];
                for range in &ranges {
                    cluster.extend_from_slice(range.last_absorbed());
                }
                members.push(cluster);
            }
            if found.len() % PROGRESS_EVERY == 0 {
                debug!(
                    prototypes = found.len(),
                    remaining, "clustering progress"
                );
            }
        }

        let mut order: Vec<usize> = (0..found.len()).collect();
        order.sort_by(|&a, &b| found[b].1.cmp(&found[a].1));

        let mut prototypes = Vec::with_capacity(found.len());
        for &i in &order {
            let (centroid, size) = found[i];
            let kmer = db
                .kmer(centroid, k)
                .ok_or(ClusterError::InstanceOutOfRange {
                    instance: centroid,
                    k,
                })?
                .to_owned_kmer();
            prototypes.push(Prototype::new(centroid, kmer, size));
        }
        let mut members = keep_members.then(|| {
            order
                .iter()
                .map(|&i| std::mem::take(&mut members[i]))
                .collect::<Vec<_>>()
        });

        let covered = n - previous_remaining;
        if self.cfg.reinsert {
            let reinserted = reinsert(
                &self.kernel,
                db,
                population,
                &mut prototypes,
                threshold,
                self.cfg.entropy,
                self.cfg.keep_members,
            );
            if self.cfg.keep_members {
                members = Some(reinserted);
            }
        }

        let stats = ClusteringStats {
            population: n,
            workers: ranges.len(),
            iterations: found.len(),
            covered,
            reinserted: self.cfg.reinsert,
            elapsed: started.elapsed(),
        };
        info!(
            population = n,
            prototypes = prototypes.len(),
            covered,
            workers = stats.workers,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "clustering finished"
        );

        Ok(Clustering {
            kmer_length: k,
            threshold,
            prototypes,
            members,
            stats,
        })
    }

    #[inline]
    fn joins(&self, db: &SequenceDatabase, instance: KmerInstance, center: KmerView<'_>) -> bool {
        db.kmer(instance, self.cfg.kmer_length)
            .is_some_and(|view| self.kernel.aligned_distance(view, center) <= self.cfg.threshold)
    }
}
