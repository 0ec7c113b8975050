//! Configuration types for active learning experiments.
//!
//! The configuration mirrors the knobs of a Learning Loss experiment: the
//! task family, the budget schedule, the joint/detached training schedule and
//! the SGD hyperparameters shared by the task model and the loss-prediction
//! head.
//!
//! # Overview
//!
//! - **Serializable**: load/save as TOML
//! - **Validated**: [`ActiveLearningConfig::validate`] rejects inconsistent
//!   budgets and hyperparameters with a configuration error
//! - **Defaulted**: every field has a default matching the reference
//!   CIFAR-10 setup
//!
//! # Example
//!
//! ```rust
//! use learning_loss_rs::config::{ActiveLearningConfig, TaskKind};
//!
//! let config = ActiveLearningConfig::builder()
//!     .task(TaskKind::Classification)
//!     .schedule(vec![2, 4, 6])
//!     .num_epochs(2)
//!     .epoch_loss_cutoff(1)
//!     .batch_size(2)
//!     .build();
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ALResult, ActiveLearningError};
use crate::schedule::QuerySchedule;

/// Task family driven by the active learning loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Image classification (top-1 accuracy).
    #[default]
    #[serde(alias = "clf")]
    Classification,

    /// Object detection (average precision).
    Detection,

    /// Human pose estimation (PCKh).
    #[serde(alias = "hpe")]
    Pose,
}

impl TaskKind {
    /// Short name used in logs and output paths.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classification => "clf",
            Self::Detection => "detection",
            Self::Pose => "hpe",
        }
    }

    /// Parses the names accepted on the command line.
    pub fn parse(s: &str) -> ALResult<Self> {
        match s.to_lowercase().as_str() {
            "clf" | "classification" => Ok(Self::Classification),
            "detection" | "det" => Ok(Self::Detection),
            "hpe" | "pose" => Ok(Self::Pose),
            other => Err(ActiveLearningError::config(format!(
                "unknown task '{other}', expected clf, detection or hpe"
            ))),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Main configuration for an active learning run.
///
/// | Parameter | Default | Description |
/// |-----------|---------|-------------|
/// | `num_trials` | 1 | Independent repetitions of the whole loop |
/// | `schedule` | 1000..=10000 step 1000 | Cumulative labeled sizes per round |
/// | `training.num_epochs` | 300 | Epochs per round |
/// | `training.epoch_loss_cutoff` | 240 | First DETACHED epoch |
/// | `training.margin` | 1.0 | Ranking hinge margin |
/// | `training.weight` | 1.0 | Ranking loss weight |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveLearningConfig {
    /// Task family.
    #[serde(default)]
    pub task: TaskKind,

    /// Number of independent trials.
    #[serde(default = "default_num_trials")]
    pub num_trials: usize,

    /// Base random seed.
    ///
    /// Trial `t` initializes its pool from `seed + t`.
    #[serde(default)]
    pub seed: u64,

    /// Use `seed` as the base seed. When false, the base seed is derived
    /// from the clock and logged; the backend is seeded from the base seed
    /// at every training attempt either way.
    #[serde(default)]
    pub fix_seed: bool,

    /// Cumulative labeled-set sizes, one per round.
    #[serde(default = "default_schedule")]
    pub schedule: Vec<usize>,

    /// Directory receiving the result file, summaries and checkpoints.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// What to do when a round's training diverges.
    #[serde(default)]
    pub divergence_policy: DivergencePolicy,

    /// Per-round training schedule.
    #[serde(default)]
    pub training: TrainingConfig,

    /// Optimizer hyperparameters.
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Query step configuration.
    #[serde(default)]
    pub query: QueryConfig,

    /// Loss-prediction head configuration.
    #[serde(default)]
    pub loss_head: LossHeadConfig,

    /// Checkpoint configuration.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

fn default_num_trials() -> usize {
    1
}
fn default_schedule() -> Vec<usize> {
    (1..=10).map(|k| k * 1000).collect()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./results")
}

impl Default for ActiveLearningConfig {
    fn default() -> Self {
        Self {
            task: TaskKind::default(),
            num_trials: default_num_trials(),
            seed: 0,
            fix_seed: false,
            schedule: default_schedule(),
            output_dir: default_output_dir(),
            divergence_policy: DivergencePolicy::default(),
            training: TrainingConfig::default(),
            optimizer: OptimizerConfig::default(),
            query: QueryConfig::default(),
            loss_head: LossHeadConfig::default(),
            checkpoint: CheckpointConfig::default(),
        }
    }
}

impl ActiveLearningConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ActiveLearningConfigBuilder {
        ActiveLearningConfigBuilder::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ALResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ActiveLearningError::config(format!(
                "failed to read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> ALResult<Self> {
        toml::from_str(content)
            .map_err(|e| ActiveLearningError::config(format!("failed to parse config: {e}")))
    }

    /// Saves configuration to a TOML file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> ALResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ActiveLearningError::Serialization {
            detail: format!("failed to serialize config: {e}"),
        })?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Returns the validated budget schedule.
    pub fn query_schedule(&self) -> ALResult<QuerySchedule> {
        QuerySchedule::new(self.schedule.clone())
    }

    /// Validates the configuration.
    ///
    /// Checks every parameter range and the relationships between the
    /// schedule, the query subset and the optimizer milestones. Dataset-size
    /// checks happen when the orchestrator starts, since the dataset is not
    /// part of the configuration.
    pub fn validate(&self) -> ALResult<()> {
        let schedule = self.query_schedule()?;

        if self.num_trials == 0 {
            return Err(ActiveLearningError::config("num_trials must be > 0"));
        }

        self.training.validate()?;
        self.optimizer.validate()?;

        if self.query.batch_size == 0 {
            return Err(ActiveLearningError::config("query.batch_size must be > 0"));
        }
        if let Some(subset) = self.query.subset {
            let largest = schedule.max_query_size();
            if subset < largest {
                return Err(ActiveLearningError::config(format!(
                    "query.subset ({subset}) is smaller than the largest query size ({largest})"
                )));
            }
        }

        if self.loss_head.interm_dim == 0 {
            return Err(ActiveLearningError::config("loss_head.interm_dim must be > 0"));
        }

        if let DivergencePolicy::RetryRound { max_retries } = self.divergence_policy {
            if max_retries == 0 {
                return Err(ActiveLearningError::config(
                    "retry_round.max_retries must be > 0 (use abort_trial instead)",
                ));
            }
        }

        Ok(())
    }

    /// Flattens the configuration into `(key, value)` pairs for the header of
    /// the result file.
    #[must_use]
    pub fn summary_lines(&self) -> Vec<(String, String)> {
        vec![
            ("task".into(), self.task.to_string()),
            ("num_trial".into(), self.num_trials.to_string()),
            ("seed".into(), self.seed.to_string()),
            ("fix_seed".into(), self.fix_seed.to_string()),
            ("query_size".into(), format!("{:?}", self.schedule)),
            ("num_epoch".into(), self.training.num_epochs.to_string()),
            ("batch_size".into(), self.training.batch_size.to_string()),
            ("epoch_loss".into(), self.training.epoch_loss_cutoff.to_string()),
            ("margin".into(), self.training.margin.to_string()),
            ("weights".into(), self.training.weight.to_string()),
            ("lr".into(), self.optimizer.lr.to_string()),
            ("momentum".into(), self.optimizer.momentum.to_string()),
            ("wdecay".into(), self.optimizer.weight_decay.to_string()),
            ("gamma".into(), self.optimizer.gamma.to_string()),
            ("milestone".into(), format!("{:?}", self.optimizer.milestones)),
            ("subset".into(), format!("{:?}", self.query.subset)),
            ("strategy".into(), format!("{:?}", self.query.strategy)),
            ("divergence_policy".into(), format!("{:?}", self.divergence_policy)),
            ("save_path".into(), self.output_dir.display().to_string()),
        ]
    }
}

/// Per-round training schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Epochs per round.
    #[serde(default = "default_num_epochs")]
    pub num_epochs: usize,

    /// Minibatch size over the labeled set.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// First epoch of the DETACHED phase.
    ///
    /// Values `>= num_epochs` keep the whole round in the JOINT phase.
    #[serde(default = "default_epoch_loss_cutoff")]
    pub epoch_loss_cutoff: usize,

    /// Margin of the pairwise ranking hinge.
    #[serde(default = "default_margin")]
    pub margin: f32,

    /// Weight of the ranking loss in the total objective.
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_num_epochs() -> usize {
    300
}
fn default_batch_size() -> usize {
    32
}
fn default_epoch_loss_cutoff() -> usize {
    240
}
fn default_margin() -> f32 {
    1.0
}
fn default_weight() -> f32 {
    1.0
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            num_epochs: default_num_epochs(),
            batch_size: default_batch_size(),
            epoch_loss_cutoff: default_epoch_loss_cutoff(),
            margin: default_margin(),
            weight: default_weight(),
        }
    }
}

impl TrainingConfig {
    fn validate(&self) -> ALResult<()> {
        if self.num_epochs == 0 {
            return Err(ActiveLearningError::config("training.num_epochs must be > 0"));
        }
        if self.batch_size == 0 {
            return Err(ActiveLearningError::config("training.batch_size must be > 0"));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ActiveLearningError::config(
                "training.margin must be finite and >= 0",
            ));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ActiveLearningError::config(
                "training.weight must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// SGD hyperparameters.
///
/// The task model and the loss-prediction head each get their own optimizer
/// and multi-step schedule built from these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Initial learning rate.
    #[serde(default = "default_lr")]
    pub lr: f64,

    /// SGD momentum (0 disables momentum).
    #[serde(default = "default_momentum")]
    pub momentum: f64,

    /// L2 weight decay (0 disables it).
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f32,

    /// Multiplicative decay applied at every milestone.
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// Epochs at which the learning rate is multiplied by `gamma`.
    #[serde(default = "default_milestones")]
    pub milestones: Vec<usize>,
}

fn default_lr() -> f64 {
    1e-3
}
fn default_momentum() -> f64 {
    0.9
}
fn default_weight_decay() -> f32 {
    5e-4
}
fn default_gamma() -> f64 {
    0.1
}
fn default_milestones() -> Vec<usize> {
    vec![160]
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            lr: default_lr(),
            momentum: default_momentum(),
            weight_decay: default_weight_decay(),
            gamma: default_gamma(),
            milestones: default_milestones(),
        }
    }
}

impl OptimizerConfig {
    fn validate(&self) -> ALResult<()> {
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            return Err(ActiveLearningError::config("optimizer.lr must be finite and > 0"));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(ActiveLearningError::config("optimizer.momentum must be in [0, 1)"));
        }
        if self.weight_decay < 0.0 {
            return Err(ActiveLearningError::config(
                "optimizer.weight_decay must be >= 0",
            ));
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(ActiveLearningError::config("optimizer.gamma must be in (0, 1]"));
        }
        if self.milestones.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ActiveLearningError::config(
                "optimizer.milestones must be strictly increasing",
            ));
        }
        Ok(())
    }
}

/// Which query strategy grows the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Rank unlabeled samples by predicted loss.
    #[default]
    LearningLoss,

    /// Uniform random baseline.
    Random,
}

/// Query step configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Score only a random subset of this size of the unlabeled pool.
    #[serde(default)]
    pub subset: Option<usize>,

    /// Minibatch size for inference passes over the unlabeled pool.
    #[serde(default = "default_query_batch_size")]
    pub batch_size: usize,

    /// Query strategy.
    #[serde(default)]
    pub strategy: StrategyKind,
}

fn default_query_batch_size() -> usize {
    128
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            subset: None,
            batch_size: default_query_batch_size(),
            strategy: StrategyKind::default(),
        }
    }
}

/// Loss-prediction head configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossHeadConfig {
    /// Width of each per-feature projection before concatenation.
    #[serde(default = "default_interm_dim")]
    pub interm_dim: usize,
}

fn default_interm_dim() -> usize {
    128
}

impl Default for LossHeadConfig {
    fn default() -> Self {
        Self {
            interm_dim: default_interm_dim(),
        }
    }
}

/// Checkpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Save the trained task model at the end of every round.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Save a pool snapshot at the start of every round.
    #[serde(default = "default_true")]
    pub save_pool: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            save_pool: true,
        }
    }
}

/// Orchestrator reaction to a diverged round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DivergencePolicy {
    /// Propagate the error and stop the run.
    #[default]
    AbortRun,

    /// Abandon the current trial and continue with the next one.
    AbortTrial,

    /// Retrain the round from a fresh model, up to `max_retries` times, then
    /// abandon the trial.
    RetryRound {
        /// Maximum retries per round.
        max_retries: usize,
    },
}

/// Builder for [`ActiveLearningConfig`].
#[derive(Debug, Default)]
pub struct ActiveLearningConfigBuilder {
    task: Option<TaskKind>,
    num_trials: Option<usize>,
    seed: Option<u64>,
    fix_seed: Option<bool>,
    schedule: Option<Vec<usize>>,
    training: TrainingConfig,
    optimizer: OptimizerConfig,
    query: QueryConfig,
    loss_head: LossHeadConfig,
    checkpoint: CheckpointConfig,
    divergence_policy: Option<DivergencePolicy>,
    output_dir: Option<PathBuf>,
}

impl ActiveLearningConfigBuilder {
    /// Sets the task family.
    #[must_use]
    pub fn task(mut self, task: TaskKind) -> Self {
        self.task = Some(task);
        self
    }

    /// Sets the number of trials.
    #[must_use]
    pub fn num_trials(mut self, trials: usize) -> Self {
        self.num_trials = Some(trials);
        self
    }

    /// Sets the base seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Uses the configured seed instead of a clock-derived one.
    #[must_use]
    pub fn fix_seed(mut self, fix: bool) -> Self {
        self.fix_seed = Some(fix);
        self
    }

    /// Sets the cumulative budget schedule.
    #[must_use]
    pub fn schedule(mut self, schedule: Vec<usize>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Sets the number of epochs per round.
    #[must_use]
    pub fn num_epochs(mut self, epochs: usize) -> Self {
        self.training.num_epochs = epochs;
        self
    }

    /// Sets the training minibatch size.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.training.batch_size = batch_size;
        self
    }

    /// Sets the first DETACHED epoch.
    #[must_use]
    pub fn epoch_loss_cutoff(mut self, epoch: usize) -> Self {
        self.training.epoch_loss_cutoff = epoch;
        self
    }

    /// Sets the ranking margin.
    #[must_use]
    pub fn margin(mut self, margin: f32) -> Self {
        self.training.margin = margin;
        self
    }

    /// Sets the ranking loss weight.
    #[must_use]
    pub fn weight(mut self, weight: f32) -> Self {
        self.training.weight = weight;
        self
    }

    /// Replaces the optimizer configuration.
    #[must_use]
    pub fn optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Sets the learning rate.
    #[must_use]
    pub fn lr(mut self, lr: f64) -> Self {
        self.optimizer.lr = lr;
        self
    }

    /// Sets the learning-rate milestones.
    #[must_use]
    pub fn milestones(mut self, milestones: Vec<usize>) -> Self {
        self.optimizer.milestones = milestones;
        self
    }

    /// Sets the query subset size.
    #[must_use]
    pub fn subset(mut self, subset: Option<usize>) -> Self {
        self.query.subset = subset;
        self
    }

    /// Sets the query strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.query.strategy = strategy;
        self
    }

    /// Sets the inference batch size used by the query step.
    #[must_use]
    pub fn query_batch_size(mut self, batch_size: usize) -> Self {
        self.query.batch_size = batch_size;
        self
    }

    /// Sets the loss head projection width.
    #[must_use]
    pub fn interm_dim(mut self, dim: usize) -> Self {
        self.loss_head.interm_dim = dim;
        self
    }

    /// Replaces the checkpoint configuration.
    #[must_use]
    pub fn checkpoint(mut self, checkpoint: CheckpointConfig) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// Sets the divergence policy.
    #[must_use]
    pub fn divergence_policy(mut self, policy: DivergencePolicy) -> Self {
        self.divergence_policy = Some(policy);
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Builds the configuration with defaults for unset values.
    ///
    /// The result is not validated; call [`ActiveLearningConfig::validate`].
    #[must_use]
    pub fn build(self) -> ActiveLearningConfig {
        ActiveLearningConfig {
            task: self.task.unwrap_or_default(),
            num_trials: self.num_trials.unwrap_or_else(default_num_trials),
            seed: self.seed.unwrap_or(0),
            fix_seed: self.fix_seed.unwrap_or(false),
            schedule: self.schedule.unwrap_or_else(default_schedule),
            training: self.training,
            optimizer: self.optimizer,
            query: self.query,
            loss_head: self.loss_head,
            checkpoint: self.checkpoint,
            divergence_policy: self.divergence_policy.unwrap_or_default(),
            output_dir: self.output_dir.unwrap_or_else(default_output_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ActiveLearningConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.schedule.first(), Some(&1000));
        assert_eq!(config.schedule.last(), Some(&10000));
        assert_eq!(config.training.epoch_loss_cutoff, 240);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ActiveLearningConfig::builder()
            .task(TaskKind::Pose)
            .schedule(vec![2, 4, 6])
            .num_epochs(3)
            .margin(0.5)
            .build();

        assert_eq!(config.task, TaskKind::Pose);
        assert_eq!(config.schedule, vec![2, 4, 6]);
        assert_eq!(config.training.num_epochs, 3);
        assert!((config.training.margin - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = ActiveLearningConfig::builder()
            .subset(Some(5000))
            .divergence_policy(DivergencePolicy::RetryRound { max_retries: 2 })
            .build();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = ActiveLearningConfig::from_toml_str(&toml_str).unwrap();

        assert_eq!(parsed.schedule, config.schedule);
        assert_eq!(parsed.query.subset, Some(5000));
        assert_eq!(
            parsed.divergence_policy,
            DivergencePolicy::RetryRound { max_retries: 2 }
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = ActiveLearningConfig::from_toml_str(
            r#"
            task = "hpe"
            schedule = [10, 20]

            [training]
            num_epochs = 5
            "#,
        )
        .unwrap();
        assert_eq!(parsed.task, TaskKind::Pose);
        assert_eq!(parsed.training.num_epochs, 5);
        assert_eq!(parsed.training.batch_size, 32);
        assert_eq!(parsed.optimizer.milestones, vec![160]);
    }

    #[test]
    fn test_subset_smaller_than_query_is_rejected() {
        let config = ActiveLearningConfig::builder()
            .schedule(vec![10, 30, 35])
            .subset(Some(15))
            .build();
        assert!(matches!(
            config.validate(),
            Err(ActiveLearningError::Config { .. })
        ));
    }

    #[test]
    fn test_invalid_schedule_is_rejected() {
        let config = ActiveLearningConfig::builder().schedule(vec![4, 4, 6]).build();
        assert!(config.validate().is_err());

        let config = ActiveLearningConfig::builder().schedule(Vec::new()).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_hyperparameters_are_rejected() {
        let config = ActiveLearningConfig::builder().margin(-1.0).build();
        assert!(config.validate().is_err());

        let config = ActiveLearningConfig::builder().lr(0.0).build();
        assert!(config.validate().is_err());

        let config = ActiveLearningConfig::builder()
            .milestones(vec![100, 50])
            .build();
        assert!(config.validate().is_err());

        let config = ActiveLearningConfig::builder()
            .divergence_policy(DivergencePolicy::RetryRound { max_retries: 0 })
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_task_kind_parsing() {
        assert_eq!(TaskKind::parse("clf").unwrap(), TaskKind::Classification);
        assert_eq!(TaskKind::parse("HPE").unwrap(), TaskKind::Pose);
        assert_eq!(TaskKind::parse("detection").unwrap(), TaskKind::Detection);
        assert!(TaskKind::parse("segmentation").is_err());
    }
}
