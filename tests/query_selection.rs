//! Query strategy integration tests
//!
//! Strategies only see the model through a `LossScorer`, so these tests
//! score pool indices from fixed tables.

use std::cell::RefCell;
use std::collections::HashSet;

use learning_loss_rs::config::{QueryConfig, StrategyKind};
use learning_loss_rs::prelude::*;
use learning_loss_rs::query::{build_strategy, rank_by_score};

/// Scores index `i` with `table[i]` and remembers which indices it saw.
struct RecordingScorer {
    table: Vec<f32>,
    seen: RefCell<Vec<Vec<usize>>>,
}

impl RecordingScorer {
    fn new(table: Vec<f32>) -> Self {
        Self {
            table,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl LossScorer for RecordingScorer {
    fn score(&self, indices: &[usize]) -> ALResult<Vec<f32>> {
        self.seen.borrow_mut().push(indices.to_vec());
        Ok(indices.iter().map(|&i| self.table[i]).collect())
    }
}

#[test]
fn test_learning_loss_takes_highest_predicted_losses() {
    let pool = Pool::from_labeled(6, vec![0]).unwrap();
    let scorer = RecordingScorer::new(vec![9.0, 0.1, 0.7, 0.3, 0.9, 0.5]);
    let mut strategy = LearningLoss::new(None, 0);

    let picked = strategy.select(3, &pool, &scorer).unwrap();
    // Index 0 has the top score but is already labeled.
    assert_eq!(picked, vec![4, 2, 5]);
    assert_eq!(scorer.seen.borrow()[0], vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_ties_break_by_ascending_index() {
    let pool = Pool::from_labeled(5, Vec::new()).unwrap();
    let scorer = RecordingScorer::new(vec![0.5, 0.8, 0.5, 0.8, 0.5]);
    let mut strategy = LearningLoss::new(None, 0);

    assert_eq!(strategy.select(4, &pool, &scorer).unwrap(), vec![1, 3, 0, 2]);
}

#[test]
fn test_nan_scores_rank_last() {
    let scored = [(0, f32::NAN), (1, -3.0), (2, f32::NAN), (3, 0.0)];
    assert_eq!(rank_by_score(&scored, 4), vec![3, 1, 0, 2]);
    assert_eq!(rank_by_score(&scored, 1), vec![3]);
}

#[test]
fn test_budget_beyond_pool_is_an_error() {
    let pool = Pool::from_labeled(4, vec![0, 1]).unwrap();
    let scorer = RecordingScorer::new(vec![0.0; 4]);
    let mut strategy = LearningLoss::new(None, 0);

    let err = strategy.select(3, &pool, &scorer).unwrap_err();
    assert!(matches!(
        err,
        ActiveLearningError::InsufficientPool {
            requested: 3,
            available: 2
        }
    ));
    // Nothing was scored for a rejected request.
    assert!(scorer.seen.borrow().is_empty());
}

#[test]
fn test_budget_beyond_subset_is_an_error() {
    let pool = Pool::from_labeled(10, Vec::new()).unwrap();
    let scorer = RecordingScorer::new(vec![0.0; 10]);
    let mut strategy = LearningLoss::new(Some(3), 0);

    assert!(matches!(
        strategy.select(4, &pool, &scorer),
        Err(ActiveLearningError::InsufficientPool { available: 3, .. })
    ));
}

#[test]
fn test_subset_scores_only_a_seeded_sample() {
    let pool = Pool::from_labeled(50, (0..10).collect()).unwrap();
    let table: Vec<f32> = (0..50).map(|i| i as f32).collect();

    let run = |seed: u64| {
        let scorer = RecordingScorer::new(table.clone());
        let mut strategy = LearningLoss::new(Some(8), seed);
        let picked = strategy.select(2, &pool, &scorer).unwrap();
        let seen = scorer.seen.borrow()[0].clone();
        (picked, seen)
    };

    let (picked, seen) = run(3);
    assert_eq!(seen.len(), 8);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert!(seen.iter().all(|i| !pool.is_labeled(*i)));
    // The two largest indices of the subset win, largest first.
    assert_eq!(picked, vec![seen[7], seen[6]]);

    assert_eq!(run(3), (picked, seen));
}

#[test]
fn test_selection_is_deterministic() {
    let pool = Pool::initialize(40, 5, 11).unwrap();
    let table: Vec<f32> = (0..40).map(|i| ((i * 7) % 13) as f32).collect();

    let select = || {
        let scorer = RecordingScorer::new(table.clone());
        LearningLoss::new(None, 1).select(6, &pool, &scorer).unwrap()
    };
    assert_eq!(select(), select());
}

#[test]
fn test_random_sampling_ignores_scores() {
    let pool = Pool::from_labeled(30, vec![0, 1, 2]).unwrap();
    let scorer = RecordingScorer::new(vec![0.0; 30]);

    let config = QueryConfig {
        strategy: StrategyKind::Random,
        ..QueryConfig::default()
    };
    let mut strategy = build_strategy(&config, 9);
    assert_eq!(strategy.name(), "random");

    let picked = strategy.select(10, &pool, &scorer).unwrap();
    let distinct: HashSet<usize> = picked.iter().copied().collect();
    assert_eq!(distinct.len(), 10);
    assert!(picked.iter().all(|i| !pool.is_labeled(*i)));
    assert!(scorer.seen.borrow().is_empty());

    let again = build_strategy(&config, 9).select(10, &pool, &scorer).unwrap();
    assert_eq!(picked, again);
}

#[test]
fn test_consecutive_queries_never_overlap() {
    let mut pool = Pool::initialize(10, 2, 4).unwrap();
    let table: Vec<f32> = (0..10).map(|i| (10 - i) as f32).collect();
    let mut strategy = LearningLoss::new(None, 0);

    let mut queried = HashSet::new();
    for budget in [2, 2] {
        let scorer = RecordingScorer::new(table.clone());
        let picked = strategy.select(budget, &pool, &scorer).unwrap();
        for idx in &picked {
            assert!(queried.insert(*idx), "index {idx} queried twice");
        }
        pool.label(&picked).unwrap();
    }
    assert_eq!(pool.num_labeled(), 6);
    assert_eq!(pool.num_unlabeled(), 4);
}
