//! Error types and round-level actions for active learning runs.
//!
//! Every failure below the orchestrator is surfaced as an
//! [`ActiveLearningError`]; nothing retries on its own. The orchestrator turns
//! a failure into a [`RoundAction`] according to the configured
//! [`DivergencePolicy`](crate::config::DivergencePolicy).
//!
//! # Error Categories
//!
//! - **Configuration**: invalid budget, schedule or hyperparameter relationships
//! - **Invariant**: the pool was asked to do something that indicates a bug
//!   upstream (labeling an index twice, out-of-range indices)
//! - **Insufficient pool**: a query budget larger than the unlabeled pool
//! - **Training divergence**: a non-finite loss during training, the only
//!   recoverable category
//! - **I/O and checkpointing**: result log and checkpoint persistence
//!
//! # Example
//!
//! ```rust
//! use learning_loss_rs::error::{ActiveLearningError, RoundAction};
//!
//! fn describe(error: &ActiveLearningError, action: &RoundAction) -> String {
//!     if error.is_recoverable() && action.can_continue() {
//!         format!("recovering: {}", action.description())
//!     } else {
//!         format!("fatal: {error}")
//!     }
//! }
//! ```

use thiserror::Error;

/// The main error type for active learning runs.
#[derive(Debug, Error)]
pub enum ActiveLearningError {
    /// Invalid budget, schedule or initial-size relationship.
    ///
    /// Rejected at startup; never produced mid-run by a valid configuration.
    #[error("Configuration error: {detail}")]
    Config {
        /// Description of the configuration issue.
        detail: String,
    },

    /// The pool was asked to label an index that is not currently unlabeled,
    /// is out of range, or appears twice in one request.
    #[error("Pool invariant violated: {detail}")]
    Invariant {
        /// Description of the violation.
        detail: String,
    },

    /// The requested query budget exceeds the remaining unlabeled samples.
    #[error("Insufficient unlabeled pool: requested {requested}, only {available} available")]
    InsufficientPool {
        /// Number of samples the query asked for.
        requested: usize,
        /// Number of samples currently unlabeled (or in the scored subset).
        available: usize,
    },

    /// A loss became NaN or infinite during training.
    #[error("Training diverged at epoch {epoch}, step {step}: {component} loss is {value}")]
    TrainingDivergence {
        /// Epoch in which divergence was detected.
        epoch: usize,
        /// Optimizer step within the round.
        step: u64,
        /// Which loss term went non-finite (`task`, `ranking` or `total`).
        component: &'static str,
        /// The offending value.
        value: f32,
    },

    /// Model or pool checkpoint could not be written or read.
    #[error("Checkpoint error: {reason}")]
    Checkpoint {
        /// Description of the checkpoint failure.
        reason: String,
    },

    /// Tensor data could not be read back from the backend.
    #[error("Tensor data error: {detail}")]
    TensorData {
        /// Description of the read-back failure.
        detail: String,
    },

    /// Serialization of a report, snapshot or configuration failed.
    #[error("Serialization error: {detail}")]
    Serialization {
        /// Description of the serialization failure.
        detail: String,
    },

    /// Underlying I/O failure (result log, output directories).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActiveLearningError {
    /// Shorthand for a configuration error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// Shorthand for a pool invariant violation.
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::Invariant {
            detail: detail.into(),
        }
    }

    /// Returns whether the orchestrator may apply its divergence policy to
    /// this error instead of stopping the run.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TrainingDivergence { .. })
    }
}

impl From<serde_json::Error> for ActiveLearningError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            detail: e.to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type ALResult<T> = Result<T, ActiveLearningError>;

/// What the orchestrator does after a round's training failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundAction {
    /// Train the same round again on a freshly constructed model.
    RetryRound {
        /// One-based retry attempt about to run.
        attempt: usize,
    },

    /// Give up on the current trial and start the next one.
    AbortTrial {
        /// Why the trial was abandoned.
        reason: String,
    },

    /// Stop the whole run and propagate the error.
    AbortRun {
        /// Why the run was stopped.
        reason: String,
    },
}

impl RoundAction {
    /// Returns whether the run continues after this action.
    #[must_use]
    pub fn can_continue(&self) -> bool {
        !matches!(self, Self::AbortRun { .. })
    }

    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::RetryRound { attempt } => format!("Retry round (attempt {attempt})"),
            Self::AbortTrial { reason } => format!("Abort trial: {reason}"),
            Self::AbortRun { reason } => format!("Abort run: {reason}"),
        }
    }
}
