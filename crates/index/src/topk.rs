use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// One ranked candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedHit {
    pub candidate: u32,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    hit: RankedHit,
    /// Offer order; breaks distance ties in favour of earlier candidates.
    seq: u64,
}

impl Slot {
    #[inline]
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.hit
            .distance
            .total_cmp(&other.hit.distance)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Fixed-capacity binary max-heap keyed on `(distance, offer order)`.
///
/// The root is the current worst entry. An offer is accepted when the heap is
/// not full or when it is strictly better than the root, which it then
/// replaces. Among equal distances the earlier offer always ranks first and
/// is the one retained.
#[derive(Debug, Clone)]
pub struct BoundedTopK {
    capacity: usize,
    heap: Vec<Slot>,
    offered: u64,
}

impl BoundedTopK {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: Vec::with_capacity(capacity),
            offered: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Current worst retained distance.
    pub fn worst(&self) -> Option<f64> {
        self.heap.first().map(|s| s.hit.distance)
    }

    /// Offer a candidate; returns whether it was kept.
    pub fn offer(&mut self, candidate: u32, distance: f64) -> bool {
        let slot = Slot {
            hit: RankedHit {
                candidate,
                distance,
            },
            seq: self.offered,
        };
        self.offered += 1;

        if self.capacity == 0 {
            return false;
        }
        if self.heap.len() < self.capacity {
            self.heap.push(slot);
            self.sift_up(self.heap.len() - 1);
            return true;
        }
        if slot.cmp_key(&self.heap[0]) == Ordering::Less {
            self.heap[0] = slot;
            self.sift_down(0);
            return true;
        }
        false
    }

    /// Retained hits, ascending by distance then offer order.
    pub fn into_sorted(mut self) -> Vec<RankedHit> {
        self.heap.sort_unstable_by(Slot::cmp_key);
        self.heap.into_iter().map(|s| s.hit).collect()
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap[i].cmp_key(&self.heap[parent]) != Ordering::Greater {
                break;
            }
            self.heap.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * i + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut largest = left;
            if right < len && self.heap[right].cmp_key(&self.heap[left]) == Ordering::Greater {
                largest = right;
            }
            if self.heap[largest].cmp_key(&self.heap[i]) != Ordering::Greater {
                break;
            }
            self.heap.swap(i, largest);
            i = largest;
        }
    }
}
