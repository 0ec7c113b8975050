//! Learning rate schedules for per-round training.
//!
//! Both optimizers of a round (task model and loss-prediction head) follow
//! the same epoch-indexed multi-step decay.
//!
//! # Example
//!
//! ```rust
//! use learning_loss_rs::lr_schedule::{LrSchedule, MultiStepLr};
//!
//! let schedule = MultiStepLr::new(0.1, 0.1, vec![160]);
//! assert!((schedule.lr_at(159) - 0.1).abs() < 1e-12);
//! assert!((schedule.lr_at(160) - 0.01).abs() < 1e-12);
//! ```

/// Trait for epoch-indexed learning rate schedules.
pub trait LrSchedule: Send + Sync {
    /// Learning rate to use throughout `epoch` (0-indexed).
    fn lr_at(&self, epoch: usize) -> f64;
}

/// Multiplies the base rate by `gamma` at every milestone epoch.
#[derive(Debug, Clone)]
pub struct MultiStepLr {
    base_lr: f64,
    gamma: f64,
    milestones: Vec<usize>,
}

impl MultiStepLr {
    /// Creates a schedule. Milestones are expected sorted ascending.
    #[must_use]
    pub fn new(base_lr: f64, gamma: f64, milestones: Vec<usize>) -> Self {
        Self {
            base_lr,
            gamma,
            milestones,
        }
    }

    /// Number of decays applied by `epoch`.
    #[must_use]
    pub fn decays_at(&self, epoch: usize) -> usize {
        self.milestones.iter().filter(|&&m| m <= epoch).count()
    }
}

impl LrSchedule for MultiStepLr {
    fn lr_at(&self, epoch: usize) -> f64 {
        let decays = i32::try_from(self.decays_at(epoch)).unwrap_or(i32::MAX);
        self.base_lr * self.gamma.powi(decays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decays_at_each_milestone() {
        let schedule = MultiStepLr::new(1.0, 0.5, vec![2, 4]);
        let lrs: Vec<f64> = (0..6).map(|e| schedule.lr_at(e)).collect();
        assert_eq!(lrs, vec![1.0, 1.0, 0.5, 0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_no_milestones_is_constant() {
        let schedule = MultiStepLr::new(3e-4, 0.1, Vec::new());
        assert_eq!(schedule.lr_at(0), 3e-4);
        assert_eq!(schedule.lr_at(10_000), 3e-4);
    }
}
