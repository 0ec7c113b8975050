//! Labeled/unlabeled partition of the training set.
//!
//! The pool is the only mutable state shared between rounds of a trial. It
//! grows monotonically through [`Pool::label`] and never shrinks. Every
//! mutation re-checks the partition invariant:
//!
//! ```text
//! labeled ∪ unlabeled = {0, .., total_size}    labeled ∩ unlabeled = ∅
//! ```
//!
//! `labeled` keeps labeling order so that per-round loaders are reproducible;
//! `unlabeled` is an ordered set so that subset sampling over it is
//! reproducible for a fixed seed.

use std::collections::{BTreeSet, HashSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{ALResult, ActiveLearningError};

/// Partition of dataset indices into labeled and unlabeled samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    total_size: usize,
    labeled: Vec<usize>,
    unlabeled: BTreeSet<usize>,
}

/// Read-only view of the pool at one point in time.
#[derive(Debug, Clone, Copy)]
pub struct PoolSplit<'a> {
    /// Labeled indices in labeling order.
    pub labeled: &'a [usize],
    /// Unlabeled indices in ascending order.
    pub unlabeled: &'a BTreeSet<usize>,
}

/// Serializable snapshot of a pool, used by round checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Dataset size.
    pub total_size: usize,
    /// Labeled indices in labeling order.
    pub labeled: Vec<usize>,
}

impl Pool {
    /// Labels `initial_labeled_size` indices drawn uniformly without
    /// replacement from `0..total_size` using `seed`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `initial_labeled_size > total_size`.
    pub fn initialize(total_size: usize, initial_labeled_size: usize, seed: u64) -> ALResult<Self> {
        if initial_labeled_size > total_size {
            return Err(ActiveLearningError::config(format!(
                "initial labeled size {initial_labeled_size} exceeds dataset size {total_size}"
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let labeled = rand::seq::index::sample(&mut rng, total_size, initial_labeled_size).into_vec();
        Self::from_labeled(total_size, labeled)
    }

    /// Builds a pool whose labeled set is exactly `labeled`, in that order.
    ///
    /// # Errors
    ///
    /// Returns an invariant error on duplicates or out-of-range indices.
    pub fn from_labeled(total_size: usize, labeled: Vec<usize>) -> ALResult<Self> {
        let mut seen = HashSet::with_capacity(labeled.len());
        for &idx in &labeled {
            if idx >= total_size {
                return Err(ActiveLearningError::invariant(format!(
                    "index {idx} is out of range for dataset of size {total_size}"
                )));
            }
            if !seen.insert(idx) {
                return Err(ActiveLearningError::invariant(format!(
                    "index {idx} appears twice in the labeled set"
                )));
            }
        }

        let unlabeled = (0..total_size).filter(|i| !seen.contains(i)).collect();
        let pool = Self {
            total_size,
            labeled,
            unlabeled,
        };
        pool.check_invariants()?;
        Ok(pool)
    }

    /// Read-only snapshot of the current partition.
    #[must_use]
    pub fn current_split(&self) -> PoolSplit<'_> {
        PoolSplit {
            labeled: &self.labeled,
            unlabeled: &self.unlabeled,
        }
    }

    /// Moves `indices` from unlabeled to labeled, appended in the given order.
    ///
    /// The request is validated as a whole before anything is moved, so a
    /// rejected call leaves the pool untouched.
    ///
    /// # Errors
    ///
    /// Returns an invariant error if any index is out of range, already
    /// labeled, or repeated within `indices`.
    pub fn label(&mut self, indices: &[usize]) -> ALResult<()> {
        let mut batch = HashSet::with_capacity(indices.len());
        for &idx in indices {
            if idx >= self.total_size {
                return Err(ActiveLearningError::invariant(format!(
                    "index {idx} is out of range for dataset of size {}",
                    self.total_size
                )));
            }
            if !batch.insert(idx) {
                return Err(ActiveLearningError::invariant(format!(
                    "index {idx} appears twice in one label request"
                )));
            }
            if !self.unlabeled.contains(&idx) {
                return Err(ActiveLearningError::invariant(format!(
                    "index {idx} is already labeled"
                )));
            }
        }

        for &idx in indices {
            self.unlabeled.remove(&idx);
            self.labeled.push(idx);
        }
        self.check_invariants()
    }

    /// Labeled indices in labeling order.
    #[must_use]
    pub fn labeled(&self) -> &[usize] {
        &self.labeled
    }

    /// Unlabeled indices in ascending order.
    #[must_use]
    pub fn unlabeled(&self) -> &BTreeSet<usize> {
        &self.unlabeled
    }

    /// Number of labeled samples.
    #[must_use]
    pub fn num_labeled(&self) -> usize {
        self.labeled.len()
    }

    /// Number of unlabeled samples.
    #[must_use]
    pub fn num_unlabeled(&self) -> usize {
        self.unlabeled.len()
    }

    /// Dataset size.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Whether `idx` is currently labeled.
    #[must_use]
    pub fn is_labeled(&self, idx: usize) -> bool {
        idx < self.total_size && !self.unlabeled.contains(&idx)
    }

    /// Captures the pool for a checkpoint.
    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            total_size: self.total_size,
            labeled: self.labeled.clone(),
        }
    }

    /// Restores a pool from a checkpoint, re-validating every invariant.
    pub fn from_snapshot(snapshot: PoolSnapshot) -> ALResult<Self> {
        Self::from_labeled(snapshot.total_size, snapshot.labeled)
    }

    fn check_invariants(&self) -> ALResult<()> {
        if self.labeled.len() + self.unlabeled.len() != self.total_size {
            return Err(ActiveLearningError::invariant(format!(
                "labeled ({}) + unlabeled ({}) != total ({})",
                self.labeled.len(),
                self.unlabeled.len(),
                self.total_size
            )));
        }
        if let Some(idx) = self.labeled.iter().find(|i| self.unlabeled.contains(i)) {
            return Err(ActiveLearningError::invariant(format!(
                "index {idx} is both labeled and unlabeled"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_sizes() {
        let pool = Pool::initialize(10, 2, 0).unwrap();
        assert_eq!(pool.num_labeled(), 2);
        assert_eq!(pool.num_unlabeled(), 8);
        assert_eq!(pool.total_size(), 10);
        for &idx in pool.labeled() {
            assert!(idx < 10);
            assert!(!pool.unlabeled().contains(&idx));
        }
    }

    #[test]
    fn test_initialize_is_seeded() {
        let a = Pool::initialize(1000, 50, 7).unwrap();
        let b = Pool::initialize(1000, 50, 7).unwrap();
        let c = Pool::initialize(1000, 50, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.labeled(), c.labeled());
    }

    #[test]
    fn test_initialize_rejects_oversized_seed_set() {
        assert!(matches!(
            Pool::initialize(5, 6, 0),
            Err(ActiveLearningError::Config { .. })
        ));
        assert_eq!(Pool::initialize(5, 5, 0).unwrap().num_unlabeled(), 0);
    }

    #[test]
    fn test_label_appends_in_order() {
        let mut pool = Pool::from_labeled(6, vec![4, 1]).unwrap();
        pool.label(&[5, 0]).unwrap();
        assert_eq!(pool.labeled(), &[4, 1, 5, 0]);
        assert_eq!(pool.unlabeled().iter().copied().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_label_rejects_already_labeled() {
        let mut pool = Pool::from_labeled(6, vec![4, 1]).unwrap();
        let err = pool.label(&[2, 4]).unwrap_err();
        assert!(matches!(err, ActiveLearningError::Invariant { .. }));
        // Rejected requests leave the pool untouched.
        assert_eq!(pool.labeled(), &[4, 1]);
        assert_eq!(pool.num_unlabeled(), 4);
    }

    #[test]
    fn test_label_rejects_duplicates_and_out_of_range() {
        let mut pool = Pool::from_labeled(6, vec![0]).unwrap();
        assert!(pool.label(&[2, 2]).is_err());
        assert!(pool.label(&[6]).is_err());
        assert_eq!(pool.num_labeled(), 1);
    }

    #[test]
    fn test_snapshot_roundtrip_revalidates() {
        let mut pool = Pool::initialize(20, 4, 3).unwrap();
        pool.label(&[pool.unlabeled().iter().copied().next().unwrap()])
            .unwrap();
        let json = serde_json::to_string(&pool.snapshot()).unwrap();
        let restored = Pool::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored, pool);

        let corrupt = PoolSnapshot {
            total_size: 4,
            labeled: vec![1, 1],
        };
        assert!(Pool::from_snapshot(corrupt).is_err());
    }
}
