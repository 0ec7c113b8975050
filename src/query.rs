//! Query strategies: which unlabeled samples to label next.
//!
//! [`LearningLoss`] scores unlabeled samples with the round's trained
//! loss-prediction head and takes the highest predicted losses.
//! [`RandomSampling`] is the uniform baseline.
//!
//! Strategies see the model only through a [`LossScorer`], so ranking and
//! budget handling can be exercised without a network. [`ViewScorer`] adapts
//! an [`InferenceView`] and a dataset into a scorer.
//!
//! # Selection order
//!
//! Scores are sorted descending; equal scores fall back to ascending pool
//! index. NaN scores rank below every finite score. The returned order is
//! the order in which the pool labels the samples.

use std::cmp::Ordering;

use burn::tensor::backend::Backend;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{QueryConfig, StrategyKind};
use crate::error::{ALResult, ActiveLearningError};
use crate::loader::IndexLoader;
use crate::loss_head::LossHead;
use crate::pool::Pool;
use crate::state::InferenceView;
use crate::task::{PoolDataset, TaskModel};

/// Produces one predicted-loss score per pool index.
pub trait LossScorer {
    /// Scores `indices`, returning values in the same order.
    ///
    /// # Errors
    ///
    /// Returns a tensor-data error if scores cannot be read back.
    fn score(&self, indices: &[usize]) -> ALResult<Vec<f32>>;
}

/// Scores samples with a trained model and head.
pub struct ViewScorer<'a, B: Backend, M, H, D> {
    view: &'a InferenceView<B, M, H>,
    dataset: &'a D,
    loader: IndexLoader,
    device: &'a B::Device,
}

impl<'a, B, M, H, D> ViewScorer<'a, B, M, H, D>
where
    B: Backend,
    M: TaskModel<B, Batch = D::Batch>,
    H: LossHead<B>,
    D: PoolDataset,
{
    /// Creates a scorer over `dataset`.
    pub fn new(
        view: &'a InferenceView<B, M, H>,
        dataset: &'a D,
        loader: IndexLoader,
        device: &'a B::Device,
    ) -> Self {
        Self {
            view,
            dataset,
            loader,
            device,
        }
    }
}

impl<B, M, H, D> LossScorer for ViewScorer<'_, B, M, H, D>
where
    B: Backend,
    M: TaskModel<B, Batch = D::Batch>,
    H: LossHead<B>,
    D: PoolDataset,
{
    fn score(&self, indices: &[usize]) -> ALResult<Vec<f32>> {
        self.view
            .predict_losses(self.dataset, indices, self.loader, self.device)
    }
}

/// Picks samples from the unlabeled pool.
pub trait QueryStrategy {
    /// Strategy name for logs and reports.
    fn name(&self) -> &'static str;

    /// Returns exactly `budget` distinct indices from `pool`'s unlabeled set,
    /// in labeling order.
    ///
    /// # Errors
    ///
    /// Returns [`ActiveLearningError::InsufficientPool`] when `budget`
    /// exceeds the unlabeled pool (or the scored subset); the budget is never
    /// silently truncated.
    fn select(&mut self, budget: usize, pool: &Pool, scorer: &dyn LossScorer) -> ALResult<Vec<usize>>;
}

/// Top-`budget` indices by descending score, ties by ascending index.
#[must_use]
pub fn rank_by_score(scored: &[(usize, f32)], budget: usize) -> Vec<usize> {
    let mut ranked = scored.to_vec();
    ranked.sort_by(|a, b| compare_scores(b.1, a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(budget).map(|(idx, _)| idx).collect()
}

fn compare_scores(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.total_cmp(&b),
    }
}

fn ensure_budget(requested: usize, available: usize) -> ALResult<()> {
    if requested > available {
        return Err(ActiveLearningError::InsufficientPool {
            requested,
            available,
        });
    }
    Ok(())
}

/// Learning Loss: label the samples the head expects the model to do worst on.
#[derive(Debug)]
pub struct LearningLoss {
    subset: Option<usize>,
    rng: StdRng,
}

impl LearningLoss {
    /// Creates the strategy. With `subset = Some(n)` only a random subset of
    /// `n` unlabeled samples is scored each round.
    #[must_use]
    pub fn new(subset: Option<usize>, seed: u64) -> Self {
        Self {
            subset,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Unlabeled indices to score this round, ascending.
    fn candidates(&mut self, pool: &Pool) -> Vec<usize> {
        let unlabeled: Vec<usize> = pool.unlabeled().iter().copied().collect();
        match self.subset {
            Some(n) if n < unlabeled.len() => {
                let mut picked: Vec<usize> = rand::seq::index::sample(&mut self.rng, unlabeled.len(), n)
                    .into_iter()
                    .map(|i| unlabeled[i])
                    .collect();
                picked.sort_unstable();
                picked
            }
            _ => unlabeled,
        }
    }
}

impl QueryStrategy for LearningLoss {
    fn name(&self) -> &'static str {
        "learning_loss"
    }

    fn select(&mut self, budget: usize, pool: &Pool, scorer: &dyn LossScorer) -> ALResult<Vec<usize>> {
        ensure_budget(budget, pool.num_unlabeled())?;
        let candidates = self.candidates(pool);
        ensure_budget(budget, candidates.len())?;

        let scores = scorer.score(&candidates)?;
        if scores.len() != candidates.len() {
            return Err(ActiveLearningError::TensorData {
                detail: format!(
                    "scorer returned {} scores for {} samples",
                    scores.len(),
                    candidates.len()
                ),
            });
        }

        let scored: Vec<(usize, f32)> = candidates.into_iter().zip(scores).collect();
        let selected = rank_by_score(&scored, budget);
        tracing::debug!(
            budget,
            scored = scored.len(),
            "selected samples by predicted loss"
        );
        Ok(selected)
    }
}

/// Uniform sampling without replacement from the unlabeled pool.
#[derive(Debug)]
pub struct RandomSampling {
    rng: StdRng,
}

impl RandomSampling {
    /// Creates the strategy.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl QueryStrategy for RandomSampling {
    fn name(&self) -> &'static str {
        "random"
    }

    fn select(&mut self, budget: usize, pool: &Pool, _scorer: &dyn LossScorer) -> ALResult<Vec<usize>> {
        ensure_budget(budget, pool.num_unlabeled())?;
        let unlabeled: Vec<usize> = pool.unlabeled().iter().copied().collect();
        Ok(rand::seq::index::sample(&mut self.rng, unlabeled.len(), budget)
            .into_iter()
            .map(|i| unlabeled[i])
            .collect())
    }
}

/// Builds the configured strategy for one trial.
#[must_use]
pub fn build_strategy(config: &QueryConfig, seed: u64) -> Box<dyn QueryStrategy> {
    match config.strategy {
        StrategyKind::LearningLoss => Box::new(LearningLoss::new(config.subset, seed)),
        StrategyKind::Random => Box::new(RandomSampling::new(seed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scores each index by a fixed lookup table.
    struct TableScorer(Vec<f32>);

    impl LossScorer for TableScorer {
        fn score(&self, indices: &[usize]) -> ALResult<Vec<f32>> {
            Ok(indices.iter().map(|&i| self.0[i]).collect())
        }
    }

    #[test]
    fn test_rank_by_score_breaks_ties_by_index() {
        let scored = vec![(7, 0.5), (2, 0.9), (4, 0.5), (1, 0.5), (9, 0.1)];
        assert_eq!(rank_by_score(&scored, 3), vec![2, 1, 4]);
        assert_eq!(rank_by_score(&scored, 10).len(), 5);
    }

    #[test]
    fn test_nan_ranks_last() {
        let scored = vec![(0, f32::NAN), (1, -3.0), (2, f32::NAN)];
        assert_eq!(rank_by_score(&scored, 3), vec![1, 0, 2]);
    }

    #[test]
    fn test_learning_loss_picks_highest_unlabeled() {
        let pool = Pool::from_labeled(6, vec![5]).unwrap();
        let scorer = TableScorer(vec![0.1, 0.7, 0.3, 0.7, 0.2, 99.0]);
        let mut strategy = LearningLoss::new(None, 0);
        let picked = strategy.select(3, &pool, &scorer).unwrap();
        // Index 5 is labeled and must never be chosen despite its score.
        assert_eq!(picked, vec![1, 3, 2]);
    }

    #[test]
    fn test_budget_larger_than_pool_fails() {
        let pool = Pool::from_labeled(4, vec![0, 1]).unwrap();
        let scorer = TableScorer(vec![0.0; 4]);
        let err = LearningLoss::new(None, 0)
            .select(3, &pool, &scorer)
            .unwrap_err();
        assert!(matches!(
            err,
            ActiveLearningError::InsufficientPool {
                requested: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn test_subset_is_seeded_and_respected() {
        let pool = Pool::from_labeled(100, vec![0]).unwrap();
        let scorer = TableScorer((0..100).map(|i| i as f32).collect());

        let a = LearningLoss::new(Some(10), 3).select(4, &pool, &scorer).unwrap();
        let b = LearningLoss::new(Some(10), 3).select(4, &pool, &scorer).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
        // Descending scores equal descending indices here.
        assert!(a.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_random_sampling_returns_distinct_unlabeled() {
        let pool = Pool::from_labeled(20, vec![3, 4, 5]).unwrap();
        let picked = RandomSampling::new(11)
            .select(8, &pool, &TableScorer(Vec::new()))
            .unwrap();
        let mut unique = picked.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 8);
        assert!(picked.iter().all(|i| !pool.is_labeled(*i)));
    }
}
