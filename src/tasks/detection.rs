//! Single-object detection: one box and an objectness score per sample.
//!
//! Boxes are `(cx, cy, w, h)` in unit image coordinates. The per-sample loss
//! is the smooth-L1 box regression (only when an object is present) plus the
//! objectness binary cross-entropy, which keeps the multi-task loss a single
//! scalar per image.

use std::cmp::Ordering;

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::backbone::{MlpBackbone, MlpBackboneConfig};
use super::{gather_rows, upload, LatentProjection};
use crate::config::TaskKind;
use crate::error::ALResult;
use crate::task::{to_host, PoolDataset, TaskBatch, TaskMetric, TaskModel, TaskOutput};

/// Box coordinates per sample.
const BOX_DIM: usize = 4;

/// IoU at which a detection counts as a true positive.
pub const IOU_THRESHOLD: f32 = 0.5;

/// A minibatch of inputs, target boxes and presence flags.
#[derive(Debug, Clone)]
pub struct DetectionBatch {
    indices: Vec<usize>,
    inputs: Vec<f32>,
    input_dim: usize,
    boxes: Vec<f32>,
    present: Vec<f32>,
}

impl TaskBatch for DetectionBatch {
    fn indices(&self) -> &[usize] {
        &self.indices
    }
}

/// Images that contain at most one box, seen through a noisy projection of
/// the box parameters.
#[derive(Debug, Clone)]
pub struct SyntheticDetection {
    inputs: Vec<f32>,
    boxes: Vec<f32>,
    present: Vec<f32>,
    input_dim: usize,
}

impl SyntheticDetection {
    /// Generates a train and a test split sharing the projection.
    #[must_use]
    pub fn generate(num_train: usize, num_test: usize, input_dim: usize, seed: u64) -> (Self, Self) {
        let mut rng = StdRng::seed_from_u64(seed);
        let projection = LatentProjection::new(BOX_DIM + 1, input_dim, 0.1, &mut rng);

        let split = |n: usize, rng: &mut StdRng| {
            let mut inputs = Vec::with_capacity(n * input_dim);
            let mut boxes = Vec::with_capacity(n * BOX_DIM);
            let mut present = Vec::with_capacity(n);
            for _ in 0..n {
                let has_object = rng.random_bool(0.7);
                let bbox = [
                    rng.random_range(0.2f32..0.8),
                    rng.random_range(0.2f32..0.8),
                    rng.random_range(0.1f32..0.5),
                    rng.random_range(0.1f32..0.5),
                ];
                let flag = if has_object { 1.0 } else { 0.0 };
                let latent = [bbox[0], bbox[1], bbox[2], bbox[3], 2.0 * flag - 1.0];
                projection.project_into(&latent, rng, &mut inputs);
                boxes.extend_from_slice(&bbox);
                present.push(flag);
            }
            Self {
                inputs,
                boxes,
                present,
                input_dim,
            }
        };

        let train = split(num_train, &mut rng);
        let test = split(num_test, &mut rng);
        (train, test)
    }

    /// Input width.
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }
}

impl PoolDataset for SyntheticDetection {
    type Batch = DetectionBatch;

    fn len(&self) -> usize {
        self.present.len()
    }

    fn batch(&self, indices: &[usize]) -> DetectionBatch {
        DetectionBatch {
            indices: indices.to_vec(),
            inputs: gather_rows(&self.inputs, self.input_dim, indices),
            input_dim: self.input_dim,
            boxes: gather_rows(&self.boxes, BOX_DIM, indices),
            present: indices.iter().map(|&i| self.present[i]).collect(),
        }
    }
}

/// Intersection over union of two `(cx, cy, w, h)` boxes.
#[must_use]
pub fn iou(a: &[f32], b: &[f32]) -> f32 {
    let corners = |r: &[f32]| {
        let (hw, hh) = (r[2].abs() / 2.0, r[3].abs() / 2.0);
        (r[0] - hw, r[1] - hh, r[0] + hw, r[1] + hh)
    };
    let (ax1, ay1, ax2, ay2) = corners(a);
    let (bx1, by1, bx2, by2) = corners(b);
    let iw = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
    let ih = (ay2.min(by2) - ay1.max(by1)).max(0.0);
    let inter = iw * ih;
    let union = (ax2 - ax1) * (ay2 - ay1) + (bx2 - bx1) * (by2 - by1) - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Average precision at [`IOU_THRESHOLD`], all-point interpolated.
#[derive(Debug, Clone, Default)]
pub struct AveragePrecision {
    detections: Vec<(f32, bool)>,
    positives: usize,
}

impl AveragePrecision {
    fn push(&mut self, score: f32, true_positive: bool) {
        self.detections.push((score, true_positive));
    }
}

impl TaskMetric for AveragePrecision {
    fn name(&self) -> &'static str {
        "ap50"
    }

    fn value(&self) -> f64 {
        if self.positives == 0 {
            return 0.0;
        }
        let mut ranked = self.detections.clone();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        let mut tp = 0usize;
        let mut points = Vec::with_capacity(ranked.len());
        for (i, &(_, hit)) in ranked.iter().enumerate() {
            if hit {
                tp += 1;
            }
            let precision = tp as f64 / (i + 1) as f64;
            let recall = tp as f64 / self.positives as f64;
            points.push((recall, precision));
        }

        // Precision envelope from the right.
        for i in (0..points.len().saturating_sub(1)).rev() {
            points[i].1 = points[i].1.max(points[i + 1].1);
        }

        let mut ap = 0.0;
        let mut prev_recall = 0.0;
        for (recall, precision) in points {
            ap += (recall - prev_recall) * precision;
            prev_recall = recall;
        }
        ap
    }
}

/// Configuration of [`Detector`].
#[derive(Config, Debug)]
pub struct DetectorConfig {
    /// Backbone.
    pub backbone: MlpBackboneConfig,
}

impl DetectorConfig {
    /// Initializes a detector on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Detector<B> {
        Detector {
            backbone: self.backbone.init(device),
            head: LinearConfig::new(self.backbone.hidden2, BOX_DIM + 1).init(device),
        }
    }
}

/// MLP box regressor with an objectness logit in the last output column.
#[derive(Module, Debug)]
pub struct Detector<B: Backend> {
    backbone: MlpBackbone<B>,
    head: Linear<B>,
}

impl<B: Backend> TaskModel<B> for Detector<B> {
    type Batch = DetectionBatch;
    type Metric = AveragePrecision;

    fn kind(&self) -> TaskKind {
        TaskKind::Detection
    }

    fn feature_dims(&self) -> Vec<usize> {
        self.backbone.feature_dims()
    }

    fn forward(&self, batch: &DetectionBatch, device: &B::Device) -> TaskOutput<B> {
        let input = upload::<B>(&batch.inputs, batch.len(), batch.input_dim, device);
        let [h1, h2] = self.backbone.forward(input);
        TaskOutput {
            predictions: self.head.forward(h2.clone()),
            features: vec![h1, h2],
        }
    }

    fn per_sample_loss(&self, output: &TaskOutput<B>, batch: &DetectionBatch, device: &B::Device) -> Tensor<B, 1> {
        let n = batch.len();
        let predicted_boxes = output.predictions.clone().slice([0..n, 0..BOX_DIM]);
        let logit = output
            .predictions
            .clone()
            .slice([0..n, BOX_DIM..BOX_DIM + 1])
            .reshape([n]);
        let boxes = upload::<B>(&batch.boxes, n, BOX_DIM, device);
        let present = Tensor::<B, 1>::from_data(TensorData::new(batch.present.clone(), [n]), device);

        // Smooth L1: 0.5·d² for |d| < 1, |d| - 0.5 beyond.
        let abs = (predicted_boxes - boxes).abs();
        let quad = abs.clone().clamp_max(1.0);
        let smooth = quad.clone().powf_scalar(2.0).mul_scalar(0.5) + (abs - quad);
        let box_loss = smooth.sum_dim(1).reshape([n]) * present.clone();

        let bce = logit.clone().clamp_min(0.0) - logit.clone() * present + logit.abs().neg().exp().log1p();

        box_loss + bce
    }

    fn accumulate(&self, metric: &mut AveragePrecision, output: &TaskOutput<B>, batch: &DetectionBatch) -> ALResult<()> {
        let width = BOX_DIM + 1;
        let predictions = to_host(output.predictions.clone())?;
        for (i, row) in predictions.chunks(width).enumerate() {
            let present = batch.present[i] > 0.5;
            let score = 1.0 / (1.0 + (-row[BOX_DIM]).exp());
            let target = &batch.boxes[i * BOX_DIM..(i + 1) * BOX_DIM];
            let hit = present && iou(&row[..BOX_DIM], target) >= IOU_THRESHOLD;
            metric.push(score, hit);
            if present {
                metric.positives += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou() {
        let a = [0.5, 0.5, 0.2, 0.2];
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(iou(&a, &[0.9, 0.9, 0.1, 0.1]), 0.0);
        // Half-overlapping boxes: intersection 0.02, union 0.06.
        let b = [0.6, 0.5, 0.2, 0.2];
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_ap_perfect_and_empty() {
        let mut metric = AveragePrecision::default();
        metric.positives = 2;
        metric.push(0.9, true);
        metric.push(0.8, true);
        metric.push(0.1, false);
        assert!((metric.value() - 1.0).abs() < 1e-12);
        assert_eq!(AveragePrecision::default().value(), 0.0);
    }

    #[test]
    fn test_ap_penalizes_confident_false_positive() {
        let mut metric = AveragePrecision::default();
        metric.positives = 1;
        metric.push(0.9, false);
        metric.push(0.5, true);
        assert!((metric.value() - 0.5).abs() < 1e-12);
    }
}

#[cfg(all(test, feature = "ndarray"))]
mod backend_tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_loss_is_per_sample_and_finite() {
        let device = Default::default();
        let (train, _) = SyntheticDetection::generate(10, 2, 8, 5);
        let model = DetectorConfig::new(MlpBackboneConfig::new(8)).init::<TestBackend>(&device);

        let batch = train.batch(&[1, 2, 3]);
        let output = model.forward(&batch, &device);
        let losses = to_host(model.per_sample_loss(&output, &batch, &device)).unwrap();
        assert_eq!(losses.len(), 3);
        assert!(losses.iter().all(|l| l.is_finite() && *l >= 0.0));
    }
}
