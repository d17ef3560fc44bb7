use std::time::Duration;

use serde::{Deserialize, Serialize};

use kernel::Distance;
use sequence::{Kmer, KmerInstance};

/// Cluster representative and its statistics.
///
/// `initial_cluster_size` comes from the covering pass. The `final_*` fields,
/// `purity` and `entropy` are filled by reinsertion and stay zero otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    pub centroid: KmerInstance,
    pub kmer: Kmer,
    pub initial_cluster_size: usize,
    /// Distinct sequences with at least one member instance.
    pub final_cluster_size: usize,
    /// Member instances over the whole population.
    pub final_instance_count: usize,
    pub purity: f64,
    pub entropy: f64,
}

impl Prototype {
    pub fn new(centroid: KmerInstance, kmer: Kmer, initial_cluster_size: usize) -> Self {
        Self {
            centroid,
            kmer,
            initial_cluster_size,
            final_cluster_size: 0,
            final_instance_count: 0,
            purity: 0.0,
            entropy: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusteringStats {
    pub population: usize,
    pub workers: usize,
    pub iterations: usize,
    /// Instances absorbed by the covering pass.
    pub covered: usize,
    pub reinserted: bool,
    pub elapsed: Duration,
}

/// Output of one clustering run, replaced wholesale on re-cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub kmer_length: usize,
    pub threshold: Distance,
    /// Sorted by descending `initial_cluster_size`.
    pub prototypes: Vec<Prototype>,
    /// Member instances per prototype, aligned with `prototypes`.
    pub members: Option<Vec<Vec<KmerInstance>>>,
    pub stats: ClusteringStats,
}

impl Clustering {
    pub fn empty(kmer_length: usize, threshold: Distance) -> Self {
        Self {
            kmer_length,
            threshold,
            prototypes: Vec::new(),
            members: None,
            stats: ClusteringStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }
}
