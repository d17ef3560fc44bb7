//! Full reinsertion pass.
//!
//! Every prototype is compared against the whole original population,
//! independently and in parallel. An instance may therefore count toward
//! several prototypes. Each worker keeps a private class tally.

use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;

use kernel::{DiagonalDistanceEngine, Distance};
use sequence::{KmerInstance, SequenceDatabase};

use crate::prototype::Prototype;

/// Fill final sizes, purity and (optionally) entropy for every prototype.
/// Returns the member lists when `keep_members` is set, else empty lists.
pub(crate) fn reinsert(
    kernel: &DiagonalDistanceEngine,
    db: &SequenceDatabase,
    population: &[KmerInstance],
    prototypes: &mut [Prototype],
    threshold: Distance,
    entropy: bool,
    keep_members: bool,
) -> Vec<Vec<KmerInstance>> {
    prototypes
        .par_iter_mut()
        .map(|prototype| {
            let k = prototype.kmer.len();
            let center = prototype.kmer.view();
            let mut members = Vec::new();
            let mut sequences: HashSet<u32> = HashSet::new();
            let mut tally: HashMap<u32, usize> = HashMap::new();
            let mut count = 0usize;

            for &instance in population {
                let Some(view) = db.kmer(instance, k) else {
                    continue;
                };
                if kernel.aligned_distance(view, center) > threshold {
                    continue;
                }
                count += 1;
                sequences.insert(instance.sequence);
                if let Some(sequence) = db.get(instance.sequence as usize) {
                    for &class in sequence.classes() {
                        *tally.entry(class).or_insert(0) += 1;
                    }
                }
                if keep_members {
                    members.push(instance);
                }
            }

            prototype.final_instance_count = count;
            prototype.final_cluster_size = sequences.len();
            prototype.purity = purity(&tally, count);
            prototype.entropy = if entropy { shannon_entropy(&tally) } else { 0.0 };
            members
        })
        .collect()
}

/// Largest class tally over the member count; `0` without members.
fn purity(tally: &HashMap<u32, usize>, members: usize) -> f64 {
    if members == 0 {
        return 0.0;
    }
    let best = tally.values().copied().max().unwrap_or(0);
    best as f64 / members as f64
}

/// Base-2 Shannon entropy of the class distribution.
fn shannon_entropy(tally: &HashMap<u32, usize>) -> f64 {
    let total: usize = tally.values().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    tally
        .values()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}
