//! End-to-end runs of the reference task families on synthetic data.
//!
//! [`run_experiment`] wires a configuration to the task family it names:
//! generates the train and test splits, builds the trainer and a model
//! factory (task model plus [`LossNet`] on its feature levels), opens the
//! result file, runs every trial and closes the context.

use std::io::Write;
use std::path::PathBuf;

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::config::{ActiveLearningConfig, TaskKind};
use crate::context::ExperimentContext;
use crate::error::{ALResult, ActiveLearningError};
use crate::loss_head::LossNetConfig;
use crate::metrics::RunSummary;
use crate::orchestrator::{ActiveLearningLoop, RunReport};
use crate::state::TrainedState;
use crate::task::{PoolDataset, TaskModel};
use crate::tasks::classification::{ClassifierConfig, SyntheticClassification};
use crate::tasks::detection::{DetectorConfig, SyntheticDetection};
use crate::tasks::pose::{PoseRegressorConfig, SyntheticPose};
use crate::tasks::MlpBackboneConfig;
use crate::trainer::LossPredictionTrainer;

/// Size and shape of the generated datasets and models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticDataConfig {
    /// Training-set size; the pool ranges over it.
    #[serde(default = "default_num_train")]
    pub num_train: usize,

    /// Test-set size.
    #[serde(default = "default_num_test")]
    pub num_test: usize,

    /// Input width.
    #[serde(default = "default_input_dim")]
    pub input_dim: usize,

    /// Classes (classification only).
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,

    /// Keypoints per skeleton (pose only).
    #[serde(default = "default_num_keypoints")]
    pub num_keypoints: usize,

    /// Backbone widths.
    #[serde(default = "default_hidden")]
    pub hidden: [usize; 2],

    /// Seed of the data generator, independent of the run seed.
    #[serde(default)]
    pub seed: u64,
}

fn default_num_train() -> usize {
    12_000
}

fn default_num_test() -> usize {
    2_000
}

fn default_input_dim() -> usize {
    32
}

fn default_num_classes() -> usize {
    10
}

fn default_num_keypoints() -> usize {
    8
}

fn default_hidden() -> [usize; 2] {
    [64, 32]
}

impl Default for SyntheticDataConfig {
    fn default() -> Self {
        Self {
            num_train: default_num_train(),
            num_test: default_num_test(),
            input_dim: default_input_dim(),
            num_classes: default_num_classes(),
            num_keypoints: default_num_keypoints(),
            hidden: default_hidden(),
            seed: 0,
        }
    }
}

impl SyntheticDataConfig {
    /// Checks that every generated dimension is non-zero.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first zero dimension.
    pub fn validate(&self) -> ALResult<()> {
        let dims = [
            ("input_dim", self.input_dim),
            ("num_classes", self.num_classes),
            ("num_keypoints", self.num_keypoints),
            ("hidden[0]", self.hidden[0]),
            ("hidden[1]", self.hidden[1]),
        ];
        match dims.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ActiveLearningError::config(format!("synthetic data {name} must be > 0"))),
            None => Ok(()),
        }
    }

    fn backbone(&self) -> MlpBackboneConfig {
        MlpBackboneConfig::new(self.input_dim)
            .with_hidden1(self.hidden[0])
            .with_hidden2(self.hidden[1])
    }
}

/// What a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    /// Per-trial reports.
    pub report: RunReport,
    /// Learning curve across trials.
    pub summary: RunSummary,
    /// Result file the rows went to.
    pub result_path: Option<PathBuf>,
}

/// Runs `config` on synthetic data for its task family.
///
/// # Errors
///
/// Propagates configuration errors at startup and every error the
/// orchestrator does not absorb through its divergence policy. Rows written
/// before a failure stay in the result file.
pub fn run_experiment<B: AutodiffBackend>(
    config: &ActiveLearningConfig,
    data: &SyntheticDataConfig,
    device: &B::Device,
) -> ALResult<ExperimentOutcome> {
    data.validate()?;
    let mut context = ExperimentContext::create(config)?;
    let backbone = data.backbone();

    let report = match config.task {
        TaskKind::Classification => {
            let (train, test) =
                SyntheticClassification::generate(data.num_train, data.num_test, data.input_dim, data.num_classes, data.seed);
            let model = ClassifierConfig::new(backbone, data.num_classes);
            drive::<B, _, _, _>(config, train, test, device, &mut context, move |d| model.init::<B>(d))?
        }
        TaskKind::Detection => {
            let (train, test) = SyntheticDetection::generate(data.num_train, data.num_test, data.input_dim, data.seed);
            let model = DetectorConfig::new(backbone);
            drive::<B, _, _, _>(config, train, test, device, &mut context, move |d| model.init::<B>(d))?
        }
        TaskKind::Pose => {
            let (train, test) =
                SyntheticPose::generate(data.num_train, data.num_test, data.input_dim, data.num_keypoints, data.seed);
            let model = PoseRegressorConfig::new(backbone, train.num_keypoints());
            drive::<B, _, _, _>(config, train, test, device, &mut context, move |d| model.init::<B>(d))?
        }
    };

    let result_path = context.result_path().map(PathBuf::from);
    let summary = context.close()?;
    tracing::info!("{}", summary.summary());
    Ok(ExperimentOutcome {
        report,
        summary,
        result_path,
    })
}

/// Runs all trials of one task family with a [`LossNet`](crate::loss_head::LossNet)
/// head on the model's feature levels.
///
/// # Errors
///
/// See [`ActiveLearningLoop::run`].
pub fn drive<B, M, D, W>(
    config: &ActiveLearningConfig,
    train: D,
    test: D,
    device: &B::Device,
    context: &mut ExperimentContext<W>,
    build: impl Fn(&B::Device) -> M,
) -> ALResult<RunReport>
where
    B: AutodiffBackend,
    M: TaskModel<B, Batch = D::Batch> + AutodiffModule<B>,
    M::InnerModule: TaskModel<B::InnerBackend, Batch = D::Batch>,
    D: PoolDataset,
    W: Write,
{
    let trainer = LossPredictionTrainer::<B, D>::new(
        config.training.clone(),
        config.optimizer.clone(),
        config.query.batch_size,
        train,
        test,
        device.clone(),
    );

    let interm_dim = config.loss_head.interm_dim;
    let factory = move |device: &B::Device| {
        let model = build(device);
        let head = LossNetConfig::new(model.feature_dims())
            .with_interm_dim(interm_dim)
            .init::<B>(device);
        TrainedState::new(model, head)
    };

    tracing::info!(
        task = %config.task,
        rounds = config.schedule.len(),
        trials = config.num_trials,
        "starting active learning run"
    );
    ActiveLearningLoop::new(config.clone(), trainer, factory)?.run(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_synthetic_data_is_valid() {
        assert!(SyntheticDataConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_are_rejected() {
        let cases = [
            SyntheticDataConfig {
                num_classes: 0,
                ..SyntheticDataConfig::default()
            },
            SyntheticDataConfig {
                input_dim: 0,
                ..SyntheticDataConfig::default()
            },
            SyntheticDataConfig {
                num_keypoints: 0,
                ..SyntheticDataConfig::default()
            },
            SyntheticDataConfig {
                hidden: [64, 0],
                ..SyntheticDataConfig::default()
            },
        ];
        for data in cases {
            let err = data.validate().unwrap_err();
            assert!(matches!(err, ActiveLearningError::Config { .. }), "{data:?}: {err}");
        }
    }
}
