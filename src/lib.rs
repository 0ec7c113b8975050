//! # learning-loss-rs
//!
//! Pool-based active learning with a learned loss-prediction head.
//!
//! ## Overview
//!
//! Active learning grows a labeled training set round by round, each time
//! asking for labels on the samples expected to teach the model the most.
//! This crate implements the *Learning Loss* strategy: a small auxiliary head
//! is trained, jointly with the task model, to predict the task loss of each
//! sample from the backbone's intermediate features. At query time the
//! unlabeled samples with the highest predicted loss are labeled next.
//!
//! ## Round Structure
//!
//! ```text
//!   ┌──────────────┐   labeled   ┌───────────────────────┐
//!   │     Pool     │────────────▶│ LossPredictionTrainer │
//!   │ labeled /    │             │  JOINT ──▶ DETACHED   │
//!   │ unlabeled    │             └──────────┬────────────┘
//!   └──────▲───────┘                        │ inference view
//!          │ label(indices)                 ▼
//!   ┌──────┴───────┐   scores    ┌───────────────────────┐
//!   │ QueryStrategy│◀────────────│  test() → accuracy    │
//!   └──────────────┘             └───────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use learning_loss_rs::config::{ActiveLearningConfig, TaskKind};
//! use learning_loss_rs::experiment::{run_experiment, SyntheticDataConfig};
//! use burn::backend::{Autodiff, NdArray};
//!
//! let config = ActiveLearningConfig::builder()
//!     .task(TaskKind::Classification)
//!     .schedule(vec![50, 100, 150])
//!     .num_epochs(20)
//!     .epoch_loss_cutoff(15)
//!     .build();
//!
//! let outcome = run_experiment::<Autodiff<NdArray>>(
//!     &config,
//!     &SyntheticDataConfig::default(),
//!     &Default::default(),
//! )?;
//! println!("{}", outcome.summary.summary());
//! # Ok::<(), learning_loss_rs::error::ActiveLearningError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `ndarray` - CPU backend for the binary, integration tests and benches
//!   (default)
//!
//! ## Architecture
//!
//! - [`config`] - Experiment configuration and validation
//! - [`error`] - Error taxonomy and round-level actions
//! - [`schedule`] - Cumulative labeling budget
//! - [`pool`] - Labeled/unlabeled partition
//! - [`phases`] - JOINT/DETACHED schedule of the loss-prediction objective
//! - [`ranking`] - Margin ranking loss
//! - [`trainer`] - Per-round joint training and evaluation
//! - [`query`] - Query strategies
//! - [`orchestrator`] - Trials × rounds driver
//! - [`context`] - Result log and run summary
//! - [`checkpoint`] - Per-round model and pool checkpoints
//! - [`experiment`] - Synthetic end-to-end runs per task family
//! - [`tasks`] - Reference task families on synthetic data

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
// Allow precision loss casts - acceptable in ML numerical code
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

// Core modules
pub mod config;
pub mod error;
pub mod phases;
pub mod pool;
pub mod schedule;

// Training
pub mod loader;
pub mod loss_head;
pub mod lr_schedule;
pub mod ranking;
pub mod state;
pub mod task;
pub mod trainer;

// Active learning loop
pub mod checkpoint;
pub mod context;
pub mod experiment;
pub mod metrics;
pub mod orchestrator;
pub mod query;

// Reference task families
pub mod tasks;

pub use config::{ActiveLearningConfig, DivergencePolicy, StrategyKind, TaskKind};
pub use error::{ALResult, ActiveLearningError, RoundAction};
pub use orchestrator::{ActiveLearningLoop, RunReport, TrialOutcome, TrialReport};
pub use phases::{LossPhase, PhaseSchedule};
pub use pool::{Pool, PoolSplit};
pub use schedule::QuerySchedule;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use learning_loss_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::context::ExperimentContext;
    pub use crate::loss_head::{LossHead, LossNet, LossNetConfig};
    pub use crate::query::{LearningLoss, LossScorer, QueryStrategy, RandomSampling};
    pub use crate::state::{InferenceView, TrainedState};
    pub use crate::task::{PoolDataset, TaskBatch, TaskMetric, TaskModel, TaskOutput};
    pub use crate::trainer::{EvalSplit, LossPredictionTrainer};
    pub use crate::{
        ALResult, ActiveLearningConfig, ActiveLearningError, ActiveLearningLoop, LossPhase, Pool,
        QuerySchedule, RoundAction, TaskKind,
    };
}
