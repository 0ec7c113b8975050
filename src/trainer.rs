//! Joint training of a task model and its loss-prediction head.
//!
//! One call to [`LossPredictionTrainer::train`] runs a full round: a fixed
//! number of epochs over the labeled pool, driven by the two-phase
//! [`PhaseSchedule`].
//!
//! # Objective
//!
//! For a minibatch with per-sample task losses `l` and predicted losses `p`:
//!
//! ```text
//! total = mean(l) + weight · margin_ranking_loss(p, detach(l))
//! ```
//!
//! In the JOINT phase the features feeding the head are the backbone's own
//! tensors, so the ranking term also trains the backbone. In the DETACHED
//! phase [`objective`] cuts them from the graph first, and only the head
//! learns from the ranking term.
//!
//! # Optimizers
//!
//! Task model and head each get their own SGD optimizer (momentum, weight
//! decay) stepped with the same [`MultiStepLr`] rate. Gradients are split
//! per module from a single backward pass.
//!
//! # Divergence
//!
//! Every step checks the task, ranking and total losses before the backward
//! pass. A non-finite value stops the round with
//! [`ActiveLearningError::TrainingDivergence`]; what happens next is the
//! orchestrator's decision.

use burn::module::AutodiffModule;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{GradientsParams, Optimizer, SgdConfig};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{OptimizerConfig, TrainingConfig};
use crate::error::{ALResult, ActiveLearningError};
use crate::loader::IndexLoader;
use crate::loss_head::LossHead;
use crate::lr_schedule::{LrSchedule, MultiStepLr};
use crate::metrics::{EpochMetrics, RoundTrainingStats};
use crate::phases::{LossPhase, PhaseSchedule};
use crate::ranking::margin_ranking_loss;
use crate::state::{InferenceView, TrainedState};
use crate::task::{PoolDataset, TaskMetric, TaskModel};

/// Loss terms of one minibatch.
#[derive(Debug, Clone)]
pub struct Objective<B: Backend> {
    /// Per-sample task loss, `[batch]`.
    pub per_sample: Tensor<B, 1>,
    /// Head output, `[batch]`.
    pub predicted: Tensor<B, 1>,
    /// Mean task loss, `[1]`.
    pub task: Tensor<B, 1>,
    /// Margin ranking loss, `[1]`.
    pub ranking: Tensor<B, 1>,
    /// `task + weight · ranking`, `[1]`.
    pub total: Tensor<B, 1>,
}

/// Builds the training objective for one minibatch in `phase`.
///
/// The stop-gradient between backbone features and the head is applied here
/// and nowhere else.
pub fn objective<B, M, H>(
    model: &M,
    head: &H,
    batch: &M::Batch,
    phase: LossPhase,
    margin: f32,
    weight: f32,
    device: &B::Device,
) -> Objective<B>
where
    B: Backend,
    M: TaskModel<B>,
    H: LossHead<B>,
{
    let output = model.forward(batch, device);
    let per_sample = model.per_sample_loss(&output, batch, device);

    let features = if phase.detaches_features() {
        output.features.into_iter().map(Tensor::detach).collect()
    } else {
        output.features
    };
    let predicted = head.predict(features);

    let ranking = margin_ranking_loss(predicted.clone(), per_sample.clone(), margin);
    let task = per_sample.clone().mean();
    let total = task.clone() + ranking.clone().mul_scalar(weight);

    Objective {
        per_sample,
        predicted,
        task,
        ranking,
        total,
    }
}

/// Which samples [`LossPredictionTrainer::test`] evaluates.
#[derive(Debug, Clone, Copy)]
pub enum EvalSplit<'a> {
    /// The whole held-out test set.
    Test,
    /// The given training-set indices, e.g. the labeled pool.
    Train(&'a [usize]),
}

impl EvalSplit<'_> {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Train(_) => "train",
        }
    }
}

/// Trains and evaluates one round's model against a training and a test set.
pub struct LossPredictionTrainer<B: AutodiffBackend, D> {
    training: TrainingConfig,
    optimizer: OptimizerConfig,
    eval_loader: IndexLoader,
    train_set: D,
    test_set: D,
    device: B::Device,
}

impl<B, D> LossPredictionTrainer<B, D>
where
    B: AutodiffBackend,
    D: PoolDataset,
{
    /// Creates a trainer over `train_set` (the pool's index space) and
    /// `test_set`.
    pub fn new(
        training: TrainingConfig,
        optimizer: OptimizerConfig,
        eval_batch_size: usize,
        train_set: D,
        test_set: D,
        device: B::Device,
    ) -> Self {
        Self {
            training,
            optimizer,
            eval_loader: IndexLoader::new(eval_batch_size),
            train_set,
            test_set,
            device,
        }
    }

    /// Dataset the pool indexes into.
    pub fn train_set(&self) -> &D {
        &self.train_set
    }

    /// Held-out dataset.
    pub fn test_set(&self) -> &D {
        &self.test_set
    }

    /// Device models live on.
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Loader used for evaluation and query passes.
    pub fn eval_loader(&self) -> IndexLoader {
        self.eval_loader
    }

    /// Training schedule.
    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }

    fn sgd(&self) -> SgdConfig {
        SgdConfig::new()
            .with_momentum(Some(
                MomentumConfig::new()
                    .with_momentum(self.optimizer.momentum)
                    .with_dampening(0.0),
            ))
            .with_weight_decay(Some(WeightDecayConfig::new(self.optimizer.weight_decay)))
    }

    /// Trains `state` on the `labeled` indices for one round.
    ///
    /// `seed` drives the per-epoch shuffling of the labeled set.
    ///
    /// # Errors
    ///
    /// Returns [`ActiveLearningError::TrainingDivergence`] on a non-finite
    /// loss, and an invariant error if `labeled` is empty.
    pub fn train<M, H>(
        &self,
        mut state: TrainedState<B, M, H>,
        labeled: &[usize],
        seed: u64,
    ) -> ALResult<(TrainedState<B, M, H>, RoundTrainingStats)>
    where
        M: TaskModel<B, Batch = D::Batch> + AutodiffModule<B>,
        H: LossHead<B> + AutodiffModule<B>,
    {
        if labeled.is_empty() {
            return Err(ActiveLearningError::invariant("cannot train on an empty labeled set"));
        }

        let sgd = self.sgd();
        let mut model_optim = sgd.init::<B, M>();
        let mut head_optim = sgd.init::<B, H>();
        let lr_schedule = MultiStepLr::new(
            self.optimizer.lr,
            self.optimizer.gamma,
            self.optimizer.milestones.clone(),
        );
        let mut phases = PhaseSchedule::new(self.training.epoch_loss_cutoff);
        let loader = IndexLoader::new(self.training.batch_size);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut stats = RoundTrainingStats::default();
        let mut step: u64 = 0;

        for epoch in 0..self.training.num_epochs {
            let phase = phases.enter_epoch(epoch);
            let lr = lr_schedule.lr_at(epoch);
            let mut task_sum = 0.0f32;
            let mut ranking_sum = 0.0f32;
            let mut epoch_steps: u64 = 0;

            for indices in loader.epoch_batches(labeled, &mut rng) {
                let batch = self.train_set.batch(&indices);
                let terms = objective(
                    &state.model,
                    &state.head,
                    &batch,
                    phase,
                    self.training.margin,
                    self.training.weight,
                    &self.device,
                );

                let task = finite(terms.task.clone(), "task", epoch, step)?;
                let ranking = finite(terms.ranking.clone(), "ranking", epoch, step)?;
                finite(terms.total.clone(), "total", epoch, step)?;

                let mut grads = terms.total.backward();
                let model_grads = GradientsParams::from_module(&mut grads, &state.model);
                let head_grads = GradientsParams::from_module(&mut grads, &state.head);
                state.model = model_optim.step(lr, state.model, model_grads);
                state.head = head_optim.step(lr, state.head, head_grads);

                task_sum += task;
                ranking_sum += ranking;
                step += 1;
                epoch_steps += 1;
            }

            let denom = epoch_steps.max(1) as f32;
            let metrics = EpochMetrics {
                epoch,
                phase,
                learning_rate: lr,
                mean_task_loss: task_sum / denom,
                mean_ranking_loss: ranking_sum / denom,
                steps: epoch_steps,
            };
            tracing::debug!(
                epoch,
                phase = phase.name(),
                lr,
                task_loss = metrics.mean_task_loss,
                ranking_loss = metrics.mean_ranking_loss,
                "epoch complete"
            );
            stats.epochs.push(metrics);
        }

        stats.total_steps = step;
        stats.transitioned_at = phases.transitioned_at();
        Ok((state, stats))
    }

    /// Evaluates `view` on `split` and returns the task metric.
    ///
    /// Deterministic for fixed weights: evaluation order is sequential and
    /// the view carries no dropout or other train-time randomness.
    ///
    /// # Errors
    ///
    /// Returns a tensor-data error if predictions cannot be read back.
    pub fn test<M, H>(
        &self,
        view: &InferenceView<B::InnerBackend, M, H>,
        round: usize,
        split: EvalSplit<'_>,
    ) -> ALResult<f64>
    where
        M: TaskModel<B::InnerBackend, Batch = D::Batch>,
        H: LossHead<B::InnerBackend>,
    {
        let (dataset, indices): (&D, Vec<usize>) = match split {
            EvalSplit::Test => (&self.test_set, (0..self.test_set.len()).collect()),
            EvalSplit::Train(indices) => (&self.train_set, indices.to_vec()),
        };

        let mut metric = M::Metric::default();
        for chunk in self.eval_loader.sequential(&indices) {
            let batch = dataset.batch(&chunk);
            let output = view.model.forward(&batch, &self.device);
            view.model.accumulate(&mut metric, &output, &batch)?;
        }

        let value = metric.value();
        tracing::debug!(
            round,
            split = split.name(),
            metric = metric.name(),
            value,
            "evaluation complete"
        );
        Ok(value)
    }
}

fn finite<B: Backend>(
    tensor: Tensor<B, 1>,
    component: &'static str,
    epoch: usize,
    step: u64,
) -> ALResult<f32> {
    let value = tensor.into_scalar().elem::<f32>();
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ActiveLearningError::TrainingDivergence {
            epoch,
            step,
            component,
            value,
        })
    }
}
