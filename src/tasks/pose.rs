//! Pose estimation: direct keypoint regression, PCKh@0.5.
//!
//! Keypoint 0 is the head top and keypoint 1 the neck; their distance is the
//! head-segment length PCKh normalizes by. Both are always visible, other
//! keypoints may be occluded and are masked out of loss and metric.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::backbone::{MlpBackbone, MlpBackboneConfig};
use super::{gather_rows, upload, LatentProjection};
use crate::config::TaskKind;
use crate::error::ALResult;
use crate::task::{to_host, PoolDataset, TaskBatch, TaskMetric, TaskModel, TaskOutput};

/// Fraction of the head segment within which a keypoint counts as correct.
pub const PCKH_THRESHOLD: f32 = 0.5;

/// A minibatch of inputs, keypoints and per-coordinate visibility.
#[derive(Debug, Clone)]
pub struct PoseBatch {
    indices: Vec<usize>,
    inputs: Vec<f32>,
    input_dim: usize,
    keypoints: Vec<f32>,
    mask: Vec<f32>,
    num_keypoints: usize,
}

impl TaskBatch for PoseBatch {
    fn indices(&self) -> &[usize] {
        &self.indices
    }
}

/// Skeletons anchored at a random neck position.
#[derive(Debug, Clone)]
pub struct SyntheticPose {
    inputs: Vec<f32>,
    keypoints: Vec<f32>,
    mask: Vec<f32>,
    input_dim: usize,
    num_keypoints: usize,
}

impl SyntheticPose {
    /// Generates a train and a test split sharing the projection.
    ///
    /// `num_keypoints` is raised to at least two (head top and neck).
    #[must_use]
    pub fn generate(
        num_train: usize,
        num_test: usize,
        input_dim: usize,
        num_keypoints: usize,
        seed: u64,
    ) -> (Self, Self) {
        let k = num_keypoints.max(2);
        let mut rng = StdRng::seed_from_u64(seed);
        let projection = LatentProjection::new(2 * k, input_dim, 0.05, &mut rng);

        let split = |n: usize, rng: &mut StdRng| {
            let mut inputs = Vec::with_capacity(n * input_dim);
            let mut keypoints = Vec::with_capacity(n * 2 * k);
            let mut mask = Vec::with_capacity(n * 2 * k);
            for _ in 0..n {
                let neck = (rng.random_range(0.3f32..0.7), rng.random_range(0.3f32..0.7));
                let head = rng.random_range(0.1f32..0.2);
                let mut pose = vec![neck.0, neck.1 - head, neck.0, neck.1];
                let mut visible = vec![1.0f32; 4];
                for _ in 2..k {
                    pose.push(neck.0 + rng.random_range(-0.3f32..0.3));
                    pose.push(neck.1 + rng.random_range(0.0f32..0.3));
                    let v = if rng.random_bool(0.85) { 1.0 } else { 0.0 };
                    visible.extend_from_slice(&[v, v]);
                }
                projection.project_into(&pose, rng, &mut inputs);
                keypoints.extend_from_slice(&pose);
                mask.extend_from_slice(&visible);
            }
            Self {
                inputs,
                keypoints,
                mask,
                input_dim,
                num_keypoints: k,
            }
        };

        let train = split(num_train, &mut rng);
        let test = split(num_test, &mut rng);
        (train, test)
    }

    /// Keypoints per skeleton.
    #[must_use]
    pub fn num_keypoints(&self) -> usize {
        self.num_keypoints
    }

    /// Input width.
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }
}

impl PoolDataset for SyntheticPose {
    type Batch = PoseBatch;

    fn len(&self) -> usize {
        self.keypoints.len() / (2 * self.num_keypoints)
    }

    fn batch(&self, indices: &[usize]) -> PoseBatch {
        let width = 2 * self.num_keypoints;
        PoseBatch {
            indices: indices.to_vec(),
            inputs: gather_rows(&self.inputs, self.input_dim, indices),
            input_dim: self.input_dim,
            keypoints: gather_rows(&self.keypoints, width, indices),
            mask: gather_rows(&self.mask, width, indices),
            num_keypoints: self.num_keypoints,
        }
    }
}

/// Percentage of visible keypoints within half a head segment.
#[derive(Debug, Clone, Default)]
pub struct Pckh {
    correct: usize,
    visible: usize,
}

impl Pckh {
    /// Scores one skeleton given flat `(x, y)` predictions and targets.
    fn update(&mut self, predicted: &[f32], target: &[f32], mask: &[f32]) {
        let head = ((target[0] - target[2]).powi(2) + (target[1] - target[3]).powi(2)).sqrt();
        for ((p, t), m) in predicted.chunks(2).zip(target.chunks(2)).zip(mask.chunks(2)) {
            if m[0] < 0.5 {
                continue;
            }
            self.visible += 1;
            let dist = ((p[0] - t[0]).powi(2) + (p[1] - t[1]).powi(2)).sqrt();
            if dist <= PCKH_THRESHOLD * head {
                self.correct += 1;
            }
        }
    }
}

impl TaskMetric for Pckh {
    fn name(&self) -> &'static str {
        "pckh@0.5"
    }

    fn value(&self) -> f64 {
        if self.visible == 0 {
            0.0
        } else {
            self.correct as f64 / self.visible as f64
        }
    }
}

/// Configuration of [`PoseRegressor`].
#[derive(Config, Debug)]
pub struct PoseRegressorConfig {
    /// Backbone.
    pub backbone: MlpBackboneConfig,
    /// Keypoints per skeleton.
    pub num_keypoints: usize,
}

impl PoseRegressorConfig {
    /// Initializes a pose regressor on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> PoseRegressor<B> {
        PoseRegressor {
            backbone: self.backbone.init(device),
            head: LinearConfig::new(self.backbone.hidden2, 2 * self.num_keypoints).init(device),
        }
    }
}

/// MLP regressing `(x, y)` for every keypoint.
#[derive(Module, Debug)]
pub struct PoseRegressor<B: Backend> {
    backbone: MlpBackbone<B>,
    head: Linear<B>,
}

impl<B: Backend> TaskModel<B> for PoseRegressor<B> {
    type Batch = PoseBatch;
    type Metric = Pckh;

    fn kind(&self) -> TaskKind {
        TaskKind::Pose
    }

    fn feature_dims(&self) -> Vec<usize> {
        self.backbone.feature_dims()
    }

    fn forward(&self, batch: &PoseBatch, device: &B::Device) -> TaskOutput<B> {
        let input = upload::<B>(&batch.inputs, batch.len(), batch.input_dim, device);
        let [h1, h2] = self.backbone.forward(input);
        TaskOutput {
            predictions: self.head.forward(h2.clone()),
            features: vec![h1, h2],
        }
    }

    /// Mean squared error over visible coordinates of each skeleton.
    fn per_sample_loss(&self, output: &TaskOutput<B>, batch: &PoseBatch, device: &B::Device) -> Tensor<B, 1> {
        let n = batch.len();
        let width = 2 * batch.num_keypoints;
        let target = upload::<B>(&batch.keypoints, n, width, device);
        let mask = upload::<B>(&batch.mask, n, width, device);

        let squared = (output.predictions.clone() - target).powf_scalar(2.0) * mask.clone();
        let visible = mask.sum_dim(1).clamp_min(1.0);
        (squared.sum_dim(1) / visible).reshape([n])
    }

    fn accumulate(&self, metric: &mut Pckh, output: &TaskOutput<B>, batch: &PoseBatch) -> ALResult<()> {
        let width = 2 * batch.num_keypoints;
        let predictions = to_host(output.predictions.clone())?;
        for (i, predicted) in predictions.chunks(width).enumerate() {
            let span = i * width..(i + 1) * width;
            metric.update(predicted, &batch.keypoints[span.clone()], &batch.mask[span]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pckh_threshold_and_mask() {
        // Head segment of length 0.2 -> tolerance 0.1.
        let target = [0.5, 0.3, 0.5, 0.5, 0.2, 0.8];
        let mask = [1.0, 1.0, 1.0, 1.0, 0.0, 0.0];
        let predicted = [0.5, 0.35, 0.5, 0.65, 0.9, 0.9];

        let mut metric = Pckh::default();
        metric.update(&predicted, &target, &mask);
        assert_eq!(metric.visible, 2);
        assert_eq!(metric.correct, 1);
        assert!((metric.value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_head_and_neck_always_visible() {
        let (train, _) = SyntheticPose::generate(20, 1, 6, 5, 2);
        let batch = train.batch(&(0..20).collect::<Vec<_>>());
        for row in batch.mask.chunks(10) {
            assert!(row[..4].iter().all(|&m| m == 1.0));
        }
    }
}

#[cfg(all(test, feature = "ndarray"))]
mod backend_tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_masked_loss_ignores_occluded_keypoints() {
        let device = Default::default();
        let (train, _) = SyntheticPose::generate(6, 1, 6, 3, 0);
        let model = PoseRegressorConfig::new(MlpBackboneConfig::new(6), 3).init::<TestBackend>(&device);
        let mut batch = train.batch(&[0, 1]);

        let output = model.forward(&batch, &device);
        let before = to_host(model.per_sample_loss(&output, &batch, &device)).unwrap();

        // Moving a masked-out target must not change the loss.
        batch.mask[4] = 0.0;
        batch.mask[5] = 0.0;
        batch.keypoints[4] += 10.0;
        let masked = to_host(model.per_sample_loss(&output, &batch, &device)).unwrap();
        batch.keypoints[5] += 10.0;
        let moved = to_host(model.per_sample_loss(&output, &batch, &device)).unwrap();
        assert_eq!(masked, moved);
        assert_eq!(before.len(), 2);
    }
}
