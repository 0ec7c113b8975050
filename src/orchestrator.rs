//! Trials × rounds driver of the active learning experiment.
//!
//! # Round structure
//!
//! ```text
//! for trial in 0..num_trials:
//!     pool = Pool::initialize(|train set|, schedule[0], seed + trial)
//!     for round in 0..|schedule|:
//!         build a fresh model and head
//!         train on pool.labeled          (divergence → policy)
//!         accuracy = test(inference view)
//!         record (trial, round, accuracy)
//!         if round is not terminal:
//!             pool.label(strategy.select(schedule[round+1] - schedule[round]))
//! ```
//!
//! The query of a round always uses that round's freshly trained inference
//! view. A diverged round never reaches the query step; depending on the
//! [`DivergencePolicy`] it is retrained from a fresh model, ends its trial,
//! or ends the run.

use std::io::Write;
use std::marker::PhantomData;

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::checkpoint::RoundCheckpointer;
use crate::config::{ActiveLearningConfig, DivergencePolicy};
use crate::context::ExperimentContext;
use crate::error::{ALResult, ActiveLearningError, RoundAction};
use crate::loss_head::LossHead;
use crate::metrics::{RoundRecord, RoundTrainingStats};
use crate::pool::{Pool, PoolSnapshot};
use crate::query::{build_strategy, ViewScorer};
use crate::schedule::QuerySchedule;
use crate::state::TrainedState;
use crate::task::{PoolDataset, TaskModel};
use crate::trainer::{EvalSplit, LossPredictionTrainer};

/// How a trial ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialOutcome {
    /// Every round of the schedule completed.
    Completed,
    /// The divergence policy gave up on the trial at `round`.
    Aborted {
        /// Round that diverged.
        round: usize,
        /// Policy decision.
        reason: String,
    },
}

/// Everything one trial produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialReport {
    /// Trial number.
    pub trial: usize,
    /// How the trial ended.
    pub outcome: TrialOutcome,
    /// Completed rounds.
    pub rounds: Vec<RoundRecord>,
    /// Pool at the end of the trial.
    pub final_pool: PoolSnapshot,
}

impl TrialReport {
    /// Number of query steps the trial performed.
    #[must_use]
    pub fn num_queries(&self) -> usize {
        self.rounds.iter().filter(|r| !r.queried.is_empty()).count()
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Seed the run derived every other seed from.
    pub base_seed: u64,
    /// One report per trial.
    pub trials: Vec<TrialReport>,
}

/// Maps a divergence after `retries` earlier retries of the same round onto
/// the action `policy` prescribes.
#[must_use]
pub fn divergence_action(policy: DivergencePolicy, retries: usize, error: &ActiveLearningError) -> RoundAction {
    match policy {
        DivergencePolicy::AbortRun => RoundAction::AbortRun {
            reason: error.to_string(),
        },
        DivergencePolicy::AbortTrial => RoundAction::AbortTrial {
            reason: error.to_string(),
        },
        DivergencePolicy::RetryRound { max_retries } if retries < max_retries => RoundAction::RetryRound {
            attempt: retries + 1,
        },
        DivergencePolicy::RetryRound { max_retries } => RoundAction::AbortTrial {
            reason: format!("still diverging after {max_retries} retries: {error}"),
        },
    }
}

/// Seed for one training attempt of one round.
fn attempt_seed(base: u64, trial: usize, round: usize, attempt: usize) -> u64 {
    base ^ ((trial as u64) << 40) ^ ((round as u64) << 20) ^ attempt as u64
}

enum RoundTraining<S> {
    Trained {
        state: S,
        stats: RoundTrainingStats,
        retries: usize,
    },
    Abandoned {
        reason: String,
    },
}

/// Drives trials and rounds over one trainer.
///
/// `factory` builds a fresh task model and loss head on the given device; it
/// is called at the start of every round and every retry.
pub struct ActiveLearningLoop<B, M, H, D, F>
where
    B: AutodiffBackend,
{
    config: ActiveLearningConfig,
    schedule: QuerySchedule,
    trainer: LossPredictionTrainer<B, D>,
    factory: F,
    checkpointer: RoundCheckpointer,
    base_seed: u64,
    _modules: PhantomData<(M, H)>,
}

impl<B, M, H, D, F> ActiveLearningLoop<B, M, H, D, F>
where
    B: AutodiffBackend,
    M: TaskModel<B, Batch = D::Batch> + AutodiffModule<B>,
    M::InnerModule: TaskModel<B::InnerBackend, Batch = D::Batch>,
    H: LossHead<B> + AutodiffModule<B>,
    H::InnerModule: LossHead<B::InnerBackend>,
    D: PoolDataset,
    F: FnMut(&B::Device) -> TrainedState<B, M, H>,
{
    /// Validates `config` against the trainer's datasets.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid configuration, a
    /// schedule that ends beyond the training set, or an empty test set.
    pub fn new(config: ActiveLearningConfig, trainer: LossPredictionTrainer<B, D>, factory: F) -> ALResult<Self> {
        config.validate()?;
        let schedule = config.query_schedule()?;

        let available = trainer.train_set().len();
        if schedule.final_size() > available {
            return Err(ActiveLearningError::config(format!(
                "schedule ends at {} labeled samples but the training set has {available}",
                schedule.final_size()
            )));
        }
        if trainer.test_set().is_empty() {
            return Err(ActiveLearningError::config("test set is empty"));
        }

        let base_seed = if config.fix_seed {
            config.seed
        } else {
            let now = chrono::Utc::now();
            (now.timestamp() as u64) ^ u64::from(now.timestamp_subsec_nanos())
        };
        tracing::info!(base_seed, fixed = config.fix_seed, "run seed");

        let checkpointer = RoundCheckpointer::new(&config.output_dir, config.checkpoint.clone());
        Ok(Self {
            config,
            schedule,
            trainer,
            factory,
            checkpointer,
            base_seed,
            _modules: PhantomData,
        })
    }

    /// Seed every other seed of the run is derived from.
    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// The validated schedule.
    #[must_use]
    pub fn schedule(&self) -> &QuerySchedule {
        &self.schedule
    }

    /// Runs every trial, logging rows into `context`.
    ///
    /// # Errors
    ///
    /// Propagates every non-recoverable error, and divergence errors under
    /// [`DivergencePolicy::AbortRun`]. Rows already written stay in the log.
    pub fn run<W: Write>(&mut self, context: &mut ExperimentContext<W>) -> ALResult<RunReport> {
        let mut trials = Vec::with_capacity(self.config.num_trials);
        for trial in 0..self.config.num_trials {
            trials.push(self.run_trial(trial, context)?);
        }
        Ok(RunReport {
            base_seed: self.base_seed,
            trials,
        })
    }

    /// Runs one trial from a fresh pool.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_trial<W: Write>(&mut self, trial: usize, context: &mut ExperimentContext<W>) -> ALResult<TrialReport> {
        let trial_seed = self.base_seed.wrapping_add(trial as u64);
        let mut pool = Pool::initialize(
            self.trainer.train_set().len(),
            self.schedule.initial_size(),
            trial_seed,
        )?;
        let mut strategy = build_strategy(&self.config.query, trial_seed.rotate_left(32));
        let mut rounds = Vec::with_capacity(self.schedule.num_rounds());

        tracing::info!(trial, strategy = strategy.name(), "trial started");

        for round in 0..self.schedule.num_rounds() {
            let expected = self.schedule.labeled_at(round).unwrap_or_default();
            if pool.num_labeled() != expected {
                return Err(ActiveLearningError::invariant(format!(
                    "round {round} starts with {} labeled samples, schedule expects {expected}",
                    pool.num_labeled()
                )));
            }
            self.checkpointer.save_pool(&pool, trial, round)?;
            tracing::info!(trial, round, labeled = pool.num_labeled(), "round started");

            let (state, stats, retries) = match self.train_round(trial, round, pool.labeled())? {
                RoundTraining::Trained { state, stats, retries } => (state, stats, retries),
                RoundTraining::Abandoned { reason } => {
                    tracing::warn!(trial, round, %reason, "trial abandoned");
                    context.abort_trial();
                    return Ok(TrialReport {
                        trial,
                        outcome: TrialOutcome::Aborted { round, reason },
                        rounds,
                        final_pool: pool.snapshot(),
                    });
                }
            };

            let view = state.inference_view();
            let accuracy = self.trainer.test(&view, round, EvalSplit::Test)?;
            tracing::info!(trial, round, labeled = pool.num_labeled(), accuracy, "round evaluated");
            self.checkpointer.save_model::<B, M>(&state.model, trial, round)?;

            let mut record = RoundRecord {
                trial,
                round,
                num_labeled: pool.num_labeled(),
                accuracy,
                queried: Vec::new(),
                retries,
                final_task_loss: stats.final_task_loss(),
            };
            context.record_round(record.clone())?;

            if let Some(budget) = self.schedule.query_size(round) {
                let scorer = ViewScorer::new(
                    &view,
                    self.trainer.train_set(),
                    self.trainer.eval_loader(),
                    self.trainer.device(),
                );
                let picked = strategy.select(budget, &pool, &scorer)?;
                pool.label(&picked)?;
                tracing::info!(trial, round, queried = picked.len(), labeled = pool.num_labeled(), "pool grown");
                context.attach_queried(&picked);
                record.queried = picked;
            }
            rounds.push(record);
        }

        context.finish_trial();
        Ok(TrialReport {
            trial,
            outcome: TrialOutcome::Completed,
            rounds,
            final_pool: pool.snapshot(),
        })
    }

    fn train_round(
        &mut self,
        trial: usize,
        round: usize,
        labeled: &[usize],
    ) -> ALResult<RoundTraining<TrainedState<B, M, H>>> {
        let mut retries = 0;
        loop {
            let seed = attempt_seed(self.base_seed, trial, round, retries);
            B::seed(seed);
            let state = (self.factory)(self.trainer.device());

            let error = match self.trainer.train(state, labeled, seed) {
                Ok((state, stats)) => {
                    tracing::debug!(
                        trial,
                        round,
                        steps = stats.total_steps,
                        detached_at = ?stats.transitioned_at,
                        "round trained"
                    );
                    return Ok(RoundTraining::Trained { state, stats, retries });
                }
                Err(error) if error.is_recoverable() => error,
                Err(error) => return Err(error),
            };

            match divergence_action(self.config.divergence_policy, retries, &error) {
                RoundAction::RetryRound { attempt } => {
                    tracing::warn!(trial, round, attempt, %error, "retrying diverged round");
                    retries = attempt;
                }
                RoundAction::AbortTrial { reason } => return Ok(RoundTraining::Abandoned { reason }),
                RoundAction::AbortRun { .. } => return Err(error),
            }
        }
    }
}
