//! # Cardinality Estimator
//!
//! A k-minimum-values sketch of the number of distinct items offered to it.
//!
//! Items are hashed to 64 bits with BLAKE3 and only the `capacity` smallest
//! hashes are kept. While fewer than `capacity` distinct hashes have been seen
//! the count is exact; afterwards it is estimated from the k-th smallest hash.
//!
//! All arithmetic is integer arithmetic (128-bit for the estimate).

use crate::primitives::{CLASS_KEY, DEFAULT_SKETCH_CAPACITY, MIN_SKETCH_CAPACITY};
use crate::types::GenericValue;
use std::collections::BTreeSet;

/// Probabilistic distinct-count summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardinalityEstimator {
    capacity: usize,
    minimums: BTreeSet<u64>,
}

impl Default for CardinalityEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl CardinalityEstimator {
    /// Create an empty estimator with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SKETCH_CAPACITY)
    }

    /// Create an empty estimator retaining `capacity` minimum hashes.
    ///
    /// Capacities below [`MIN_SKETCH_CAPACITY`] are raised to it.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(MIN_SKETCH_CAPACITY),
            minimums: BTreeSet::new(),
        }
    }

    /// Number of minimum hashes retained.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if nothing has been offered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.minimums.is_empty()
    }

    /// Offer an item. Offering the same item twice has no effect.
    pub fn offer(&mut self, item: impl AsRef<[u8]>) {
        self.insert_hash(hash64(item.as_ref()));
    }

    /// Fold another estimator into this one.
    ///
    /// The result estimates the cardinality of the union of both inputs.
    pub fn merge(&mut self, other: &Self) {
        for &hash in &other.minimums {
            self.insert_hash(hash);
        }
    }

    /// Estimated number of distinct items offered.
    #[must_use]
    pub fn cardinality(&self) -> u64 {
        let retained = self.minimums.len();
        let Some(&kth) = self.minimums.last() else {
            return 0;
        };
        if retained < self.capacity {
            return retained as u64;
        }
        // (k - 1) * 2^64 / (kth + 1)
        let numerator = (retained as u128 - 1) << 64;
        let estimate = numerator / (u128::from(kth) + 1);
        u64::try_from(estimate).unwrap_or(u64::MAX)
    }

    pub(crate) fn to_generic(&self) -> GenericValue {
        serde_json::json!({
            CLASS_KEY: "CardinalityEstimator",
            "capacity": self.capacity,
            "minimums": self.minimums.iter().collect::<Vec<_>>(),
        })
    }

    fn insert_hash(&mut self, hash: u64) {
        if self.minimums.len() < self.capacity {
            self.minimums.insert(hash);
            return;
        }
        let below_max = self.minimums.last().is_some_and(|&max| hash < max);
        if below_max && self.minimums.insert(hash) {
            self.minimums.pop_last();
        }
    }
}

fn hash64(bytes: &[u8]) -> u64 {
    let digest = blake3::hash(bytes);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn offered(count: u64, capacity: usize) -> CardinalityEstimator {
        let mut estimator = CardinalityEstimator::with_capacity(capacity);
        for i in 0..count {
            estimator.offer(format!("vertex-{i}"));
        }
        estimator
    }

    #[test]
    fn empty_estimator_counts_zero() {
        let estimator = CardinalityEstimator::new();
        assert!(estimator.is_empty());
        assert_eq!(estimator.cardinality(), 0);
    }

    #[test]
    fn exact_below_capacity() {
        assert_eq!(offered(42, 256).cardinality(), 42);
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut estimator = CardinalityEstimator::new();
        estimator.offer("a");
        estimator.offer("a");
        estimator.offer("b");
        assert_eq!(estimator.cardinality(), 2);
    }

    #[test]
    fn estimate_is_close_above_capacity() {
        let estimate = offered(10_000, 256).cardinality();
        // k = 256 gives a standard error around 6%; allow 25%.
        assert!((7_500..=12_500).contains(&estimate), "estimate {estimate}");
    }

    #[test]
    fn retained_hashes_never_exceed_capacity() {
        let estimator = offered(1_000, 16);
        assert_eq!(estimator.minimums.len(), 16);
    }

    #[test]
    fn merge_estimates_union() {
        let mut left = CardinalityEstimator::new();
        let mut right = CardinalityEstimator::new();
        for i in 0..30 {
            left.offer(format!("v{i}"));
        }
        for i in 20..50 {
            right.offer(format!("v{i}"));
        }
        left.merge(&right);
        assert_eq!(left.cardinality(), 50);
    }

    #[test]
    fn capacity_has_a_floor() {
        assert_eq!(
            CardinalityEstimator::with_capacity(0).capacity(),
            MIN_SKETCH_CAPACITY
        );
    }
}
