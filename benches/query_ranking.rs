//! Query step benchmarks.
//!
//! Measures ranking of predicted losses and subset selection over pools of
//! realistic size, independent of the model forward pass.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use learning_loss_rs::pool::Pool;
use learning_loss_rs::query::{rank_by_score, LearningLoss, LossScorer, QueryStrategy};
use learning_loss_rs::ALResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Looks scores up in a precomputed table.
struct TableScorer(Vec<f32>);

impl LossScorer for TableScorer {
    fn score(&self, indices: &[usize]) -> ALResult<Vec<f32>> {
        Ok(indices.iter().map(|&i| self.0[i]).collect())
    }
}

fn random_scores(n: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..n).map(|_| rng.random::<f32>()).collect()
}

fn benchmark_rank_by_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_by_score");
    for &n in &[1_000usize, 10_000, 50_000] {
        let scored: Vec<(usize, f32)> = random_scores(n).into_iter().enumerate().collect();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &scored, |b, scored| {
            b.iter(|| black_box(rank_by_score(black_box(scored), 1_000)))
        });
    }
    group.finish();
}

fn benchmark_learning_loss_select(c: &mut Criterion) {
    let total = 50_000;
    let scorer = TableScorer(random_scores(total));
    let pool = Pool::initialize(total, 5_000, 1).expect("pool");

    let mut group = c.benchmark_group("learning_loss_select");
    for subset in [None, Some(10_000)] {
        let label = subset.map_or_else(|| "full".to_string(), |n| format!("subset_{n}"));
        group.bench_function(label, |b| {
            let mut strategy = LearningLoss::new(subset, 7);
            b.iter(|| black_box(strategy.select(1_000, &pool, &scorer).expect("select")))
        });
    }
    group.finish();
}

criterion_group!(
    query_benches,
    benchmark_rank_by_score,
    benchmark_learning_loss_select,
);
criterion_main!(query_benches);
