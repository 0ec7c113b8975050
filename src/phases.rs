//! Two-phase schedule of the loss-prediction objective.
//!
//! A round starts in the JOINT phase, where the ranking loss of the
//! loss-prediction head backpropagates into the shared backbone. At a fixed
//! epoch it switches, once and for good, to the DETACHED phase, where the
//! backbone features are cut from the graph before they reach the head:
//!
//! ```text
//! JOINT ──(epoch == epoch_loss_cutoff)──▶ DETACHED ──(epoch == num_epochs)──▶ done
//! ```
//!
//! In the DETACHED phase the head keeps learning to predict loss, but it can
//! no longer pull the backbone away from the task objective.

use serde::{Deserialize, Serialize};

/// Phase of the joint training objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LossPhase {
    /// Ranking loss gradients flow into the backbone.
    Joint,

    /// Backbone features are detached before the loss-prediction head.
    Detached,
}

impl LossPhase {
    /// Returns a human-readable name for the phase.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Joint => "joint",
            Self::Detached => "detached",
        }
    }

    /// Whether the stop-gradient is applied between backbone and head.
    #[must_use]
    pub fn detaches_features(&self) -> bool {
        matches!(self, Self::Detached)
    }
}

/// Epoch-driven, one-way JOINT → DETACHED switch.
#[derive(Debug, Clone)]
pub struct PhaseSchedule {
    cutoff: usize,
    current: LossPhase,
    transitioned_at: Option<usize>,
}

impl PhaseSchedule {
    /// Creates a schedule whose first DETACHED epoch is `epoch_loss_cutoff`.
    #[must_use]
    pub fn new(epoch_loss_cutoff: usize) -> Self {
        Self {
            cutoff: epoch_loss_cutoff,
            current: LossPhase::Joint,
            transitioned_at: None,
        }
    }

    /// Phase in effect at `epoch`, ignoring history.
    #[must_use]
    pub fn phase_at(&self, epoch: usize) -> LossPhase {
        if epoch < self.cutoff {
            LossPhase::Joint
        } else {
            LossPhase::Detached
        }
    }

    /// Advances the state machine to `epoch` and returns the phase to train
    /// with.
    ///
    /// Once DETACHED the schedule stays DETACHED even if asked about an
    /// earlier epoch.
    pub fn enter_epoch(&mut self, epoch: usize) -> LossPhase {
        if self.current == LossPhase::Joint && self.phase_at(epoch) == LossPhase::Detached {
            self.current = LossPhase::Detached;
            self.transitioned_at = Some(epoch);
            tracing::info!(
                epoch,
                "loss-prediction head detached from backbone features"
            );
        }
        self.current
    }

    /// Current phase.
    #[must_use]
    pub fn current(&self) -> LossPhase {
        self.current
    }

    /// Epoch at which the switch happened, if it happened.
    #[must_use]
    pub fn transitioned_at(&self) -> Option<usize> {
        self.transitioned_at
    }
}
