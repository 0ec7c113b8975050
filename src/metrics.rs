//! Training and active-learning metrics.
//!
//! Three granularities are recorded:
//!
//! - **Epoch**: phase, learning rate and mean losses of one training epoch
//! - **Round**: accuracy on the held-out split after training on a fixed
//!   labeled snapshot, plus the indices queried at the end of the round
//! - **Run**: the active-learning curve, i.e. mean and standard deviation of
//!   accuracy per round across trials
//!
//! The run summary is exported as JSON next to the result file.

use serde::{Deserialize, Serialize};

use crate::phases::LossPhase;

/// Metrics for a single training epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Epoch number within the round (0-indexed).
    pub epoch: usize,

    /// Phase the epoch trained in.
    pub phase: LossPhase,

    /// Learning rate used by both optimizers.
    pub learning_rate: f64,

    /// Mean over minibatches of the mean per-sample task loss.
    pub mean_task_loss: f32,

    /// Mean over minibatches of the margin ranking loss.
    pub mean_ranking_loss: f32,

    /// Optimizer steps taken in the epoch.
    pub steps: u64,
}

/// Everything `train()` reports about one round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundTrainingStats {
    /// Per-epoch history.
    pub epochs: Vec<EpochMetrics>,

    /// Optimizer steps over the whole round.
    pub total_steps: u64,

    /// Epoch of the JOINT → DETACHED switch, if it happened.
    pub transitioned_at: Option<usize>,
}

impl RoundTrainingStats {
    /// Task loss of the last epoch.
    #[must_use]
    pub fn final_task_loss(&self) -> Option<f32> {
        self.epochs.last().map(|e| e.mean_task_loss)
    }

    /// Ranking loss of the last epoch.
    #[must_use]
    pub fn final_ranking_loss(&self) -> Option<f32> {
        self.epochs.last().map(|e| e.mean_ranking_loss)
    }
}

/// Outcome of one completed round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Trial number.
    pub trial: usize,

    /// Round number.
    pub round: usize,

    /// Labeled-set size the round trained on.
    pub num_labeled: usize,

    /// Held-out accuracy.
    pub accuracy: f64,

    /// Indices handed to the pool at the end of the round, in labeling
    /// order; empty for the terminal round.
    pub queried: Vec<usize>,

    /// Retries the round needed after a divergence.
    pub retries: usize,

    /// Final epoch's task loss.
    pub final_task_loss: Option<f32>,
}

/// One point of the active-learning curve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurvePoint {
    /// Round number.
    pub round: usize,

    /// Labeled-set size at the round.
    pub num_labeled: usize,

    /// Trials that completed the round.
    pub trials: usize,

    /// Mean accuracy across those trials.
    pub mean_accuracy: f64,

    /// Population standard deviation of accuracy.
    pub std_accuracy: f64,
}

/// Aggregate of a whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Trials that ran to the end.
    pub completed_trials: usize,

    /// Trials abandoned by the divergence policy.
    pub aborted_trials: usize,

    /// Accuracy per round, aggregated across trials.
    pub curve: Vec<CurvePoint>,
}

impl RunSummary {
    /// Aggregates round records into the learning curve.
    #[must_use]
    pub fn from_records(records: &[RoundRecord], completed_trials: usize, aborted_trials: usize) -> Self {
        let num_rounds = records.iter().map(|r| r.round + 1).max().unwrap_or(0);

        let curve = (0..num_rounds)
            .filter_map(|round| {
                let rows: Vec<&RoundRecord> = records.iter().filter(|r| r.round == round).collect();
                let first = rows.first()?;
                let n = rows.len() as f64;
                let mean = rows.iter().map(|r| r.accuracy).sum::<f64>() / n;
                let var = rows.iter().map(|r| (r.accuracy - mean).powi(2)).sum::<f64>() / n;
                Some(CurvePoint {
                    round,
                    num_labeled: first.num_labeled,
                    trials: rows.len(),
                    mean_accuracy: mean,
                    std_accuracy: var.sqrt(),
                })
            })
            .collect();

        Self {
            completed_trials,
            aborted_trials,
            curve,
        }
    }

    /// Exports the summary to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Returns a console-friendly summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Active Learning Summary:\n├─ Trials: {} completed, {} aborted",
            self.completed_trials, self.aborted_trials
        );
        for point in &self.curve {
            out.push_str(&format!(
                "\n├─ Round {} ({} labeled): {:.4} ± {:.4} over {} trial(s)",
                point.round, point.num_labeled, point.mean_accuracy, point.std_accuracy, point.trials
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(trial: usize, round: usize, accuracy: f64) -> RoundRecord {
        RoundRecord {
            trial,
            round,
            num_labeled: (round + 1) * 2,
            accuracy,
            queried: Vec::new(),
            retries: 0,
            final_task_loss: None,
        }
    }

    #[test]
    fn test_curve_mean_and_std() {
        let records = vec![
            record(0, 0, 0.5),
            record(0, 1, 0.6),
            record(1, 0, 0.7),
            record(1, 1, 0.6),
        ];
        let summary = RunSummary::from_records(&records, 2, 0);
        assert_eq!(summary.curve.len(), 2);
        assert!((summary.curve[0].mean_accuracy - 0.6).abs() < 1e-12);
        assert!((summary.curve[0].std_accuracy - 0.1).abs() < 1e-12);
        assert_eq!(summary.curve[1].std_accuracy, 0.0);
        assert_eq!(summary.curve[1].num_labeled, 4);
    }

    #[test]
    fn test_aborted_trial_shortens_late_rounds() {
        // Trial 1 aborted after round 0.
        let records = vec![record(0, 0, 0.4), record(0, 1, 0.8), record(1, 0, 0.6)];
        let summary = RunSummary::from_records(&records, 1, 1);
        assert_eq!(summary.curve[0].trials, 2);
        assert_eq!(summary.curve[1].trials, 1);
    }

    #[test]
    fn test_json_export() {
        let summary = RunSummary::from_records(&[record(0, 0, 1.0)], 1, 0);
        let json = summary.to_json().unwrap();
        assert!(json.contains("mean_accuracy"));
        assert!(summary.summary().contains("Round 0"));
    }
}
