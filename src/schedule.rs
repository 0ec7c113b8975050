//! Cumulative labeling budget schedule.
//!
//! A schedule such as `[1000, 2000, 3000]` describes three rounds: the first
//! trains on the 1000 initially labeled samples and queries 1000 more, the
//! second trains on 2000 and queries 1000 more, and the last trains on 3000
//! and queries nothing.

use serde::{Deserialize, Serialize};

use crate::error::{ALResult, ActiveLearningError};

/// Strictly increasing cumulative labeled-set sizes, one per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct QuerySchedule {
    sizes: Vec<usize>,
}

impl QuerySchedule {
    /// Validates and wraps a cumulative schedule.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the schedule is empty, starts at
    /// zero, or is not strictly increasing.
    pub fn new(sizes: Vec<usize>) -> ALResult<Self> {
        let Some(&first) = sizes.first() else {
            return Err(ActiveLearningError::config("schedule must not be empty"));
        };
        if first == 0 {
            return Err(ActiveLearningError::config(
                "schedule must start with a non-zero initial labeled size",
            ));
        }
        if let Some(w) = sizes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ActiveLearningError::config(format!(
                "schedule must be strictly increasing, found {} followed by {}",
                w[0], w[1]
            )));
        }
        Ok(Self { sizes })
    }

    /// Number of rounds.
    #[must_use]
    pub fn num_rounds(&self) -> usize {
        self.sizes.len()
    }

    /// Size of the initially labeled pool.
    #[must_use]
    pub fn initial_size(&self) -> usize {
        self.sizes[0]
    }

    /// Labeled-set size after the last query.
    #[must_use]
    pub fn final_size(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    /// Labeled-set size that round `round` trains on.
    #[must_use]
    pub fn labeled_at(&self, round: usize) -> Option<usize> {
        self.sizes.get(round).copied()
    }

    /// Number of samples queried at the end of `round`.
    ///
    /// Returns `None` for the terminal round and for rounds past the end;
    /// the last element never contributes a query size.
    #[must_use]
    pub fn query_size(&self, round: usize) -> Option<usize> {
        let next = self.sizes.get(round + 1)?;
        Some(next - self.sizes[round])
    }

    /// Whether `round` is the terminal round.
    #[must_use]
    pub fn is_terminal(&self, round: usize) -> bool {
        round + 1 >= self.sizes.len()
    }

    /// Largest per-round query size, zero for a single-round schedule.
    #[must_use]
    pub fn max_query_size(&self) -> usize {
        self.sizes
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }

    /// The cumulative sizes.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.sizes
    }
}

impl TryFrom<Vec<usize>> for QuerySchedule {
    type Error = ActiveLearningError;

    fn try_from(sizes: Vec<usize>) -> ALResult<Self> {
        Self::new(sizes)
    }
}

impl From<QuerySchedule> for Vec<usize> {
    fn from(schedule: QuerySchedule) -> Self {
        schedule.sizes
    }
}
