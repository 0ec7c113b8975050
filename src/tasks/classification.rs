//! Classification: cross-entropy per sample, top-1 accuracy.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::log_softmax;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::backbone::{MlpBackbone, MlpBackboneConfig};
use super::{gather_rows, upload, LatentProjection};
use crate::config::TaskKind;
use crate::error::ALResult;
use crate::task::{to_host, PoolDataset, TaskBatch, TaskMetric, TaskModel, TaskOutput};

/// A minibatch of inputs and class labels.
#[derive(Debug, Clone)]
pub struct ClassificationBatch {
    indices: Vec<usize>,
    inputs: Vec<f32>,
    input_dim: usize,
    labels: Vec<i64>,
}

impl ClassificationBatch {
    /// Class labels in batch order.
    #[must_use]
    pub fn labels(&self) -> &[i64] {
        &self.labels
    }
}

impl TaskBatch for ClassificationBatch {
    fn indices(&self) -> &[usize] {
        &self.indices
    }
}

/// Gaussian-ish blobs around random class centers, seen through a noisy
/// projection.
#[derive(Debug, Clone)]
pub struct SyntheticClassification {
    inputs: Vec<f32>,
    labels: Vec<i64>,
    input_dim: usize,
    num_classes: usize,
}

impl SyntheticClassification {
    /// Generates a train and a test split sharing class centers and
    /// projection.
    #[must_use]
    pub fn generate(
        num_train: usize,
        num_test: usize,
        input_dim: usize,
        num_classes: usize,
        seed: u64,
    ) -> (Self, Self) {
        let mut rng = StdRng::seed_from_u64(seed);
        let latent_dim = num_classes.max(2);
        let projection = LatentProjection::new(latent_dim, input_dim, 0.3, &mut rng);
        let centers: Vec<Vec<f32>> = (0..num_classes)
            .map(|_| (0..latent_dim).map(|_| rng.random_range(-2.0f32..2.0)).collect())
            .collect();

        let split = |n: usize, rng: &mut StdRng| {
            let mut inputs = Vec::with_capacity(n * input_dim);
            let mut labels = Vec::with_capacity(n);
            for _ in 0..n {
                let label = rng.random_range(0..num_classes);
                let latent: Vec<f32> = centers[label]
                    .iter()
                    .map(|c| c + rng.random_range(-0.5f32..0.5))
                    .collect();
                projection.project_into(&latent, rng, &mut inputs);
                labels.push(label as i64);
            }
            Self {
                inputs,
                labels,
                input_dim,
                num_classes,
            }
        };

        let train = split(num_train, &mut rng);
        let test = split(num_test, &mut rng);
        (train, test)
    }

    /// Number of classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Input width.
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }
}

impl PoolDataset for SyntheticClassification {
    type Batch = ClassificationBatch;

    fn len(&self) -> usize {
        self.labels.len()
    }

    fn batch(&self, indices: &[usize]) -> ClassificationBatch {
        ClassificationBatch {
            indices: indices.to_vec(),
            inputs: gather_rows(&self.inputs, self.input_dim, indices),
            input_dim: self.input_dim,
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Fraction of samples whose arg-max logit is the label.
#[derive(Debug, Clone, Default)]
pub struct TopOneAccuracy {
    correct: usize,
    total: usize,
}

impl TaskMetric for TopOneAccuracy {
    fn name(&self) -> &'static str {
        "top1"
    }

    fn value(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Configuration of [`Classifier`].
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    /// Backbone.
    pub backbone: MlpBackboneConfig,
    /// Number of classes.
    pub num_classes: usize,
}

impl ClassifierConfig {
    /// Initializes a classifier on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Classifier<B> {
        Classifier {
            backbone: self.backbone.init(device),
            head: LinearConfig::new(self.backbone.hidden2, self.num_classes).init(device),
        }
    }
}

/// MLP classifier.
#[derive(Module, Debug)]
pub struct Classifier<B: Backend> {
    backbone: MlpBackbone<B>,
    head: Linear<B>,
}

impl<B: Backend> Classifier<B> {
    /// The backbone.
    pub fn backbone(&self) -> &MlpBackbone<B> {
        &self.backbone
    }
}

impl<B: Backend> TaskModel<B> for Classifier<B> {
    type Batch = ClassificationBatch;
    type Metric = TopOneAccuracy;

    fn kind(&self) -> TaskKind {
        TaskKind::Classification
    }

    fn feature_dims(&self) -> Vec<usize> {
        self.backbone.feature_dims()
    }

    fn forward(&self, batch: &ClassificationBatch, device: &B::Device) -> TaskOutput<B> {
        let input = upload::<B>(&batch.inputs, batch.len(), batch.input_dim, device);
        let [h1, h2] = self.backbone.forward(input);
        TaskOutput {
            predictions: self.head.forward(h2.clone()),
            features: vec![h1, h2],
        }
    }

    fn per_sample_loss(
        &self,
        output: &TaskOutput<B>,
        batch: &ClassificationBatch,
        device: &B::Device,
    ) -> Tensor<B, 1> {
        let n = batch.len();
        let labels = Tensor::<B, 2, Int>::from_data(
            TensorData::new(batch.labels.clone(), [n, 1]).convert::<B::IntElem>(),
            device,
        );
        log_softmax(output.predictions.clone(), 1)
            .gather(1, labels)
            .neg()
            .reshape([n])
    }

    fn accumulate(
        &self,
        metric: &mut TopOneAccuracy,
        output: &TaskOutput<B>,
        batch: &ClassificationBatch,
    ) -> ALResult<()> {
        let [n, classes] = output.predictions.dims();
        let logits = to_host(output.predictions.clone())?;
        for (row, &label) in logits.chunks(classes).zip(&batch.labels).take(n) {
            let predicted = row
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i as i64);
            if predicted == Some(label) {
                metric.correct += 1;
            }
            metric.total += 1;
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "ndarray"))]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_per_sample_loss_shape_and_sign() {
        let device = Default::default();
        let (train, _) = SyntheticClassification::generate(12, 4, 6, 3, 0);
        let model = ClassifierConfig::new(MlpBackboneConfig::new(6), 3).init::<TestBackend>(&device);

        let batch = train.batch(&[0, 3, 5, 7]);
        let output = model.forward(&batch, &device);
        assert_eq!(output.features.len(), 2);
        assert_eq!(output.features[0].dims(), [4, 64]);

        let losses = to_host(model.per_sample_loss(&output, &batch, &device)).unwrap();
        assert_eq!(losses.len(), 4);
        assert!(losses.iter().all(|l| l.is_finite() && *l >= 0.0));
    }

    #[test]
    fn test_accuracy_counts_every_sample() {
        let device = Default::default();
        let (_, test) = SyntheticClassification::generate(4, 10, 6, 3, 1);
        let model = ClassifierConfig::new(MlpBackboneConfig::new(6), 3).init::<TestBackend>(&device);

        let batch = test.batch(&(0..10).collect::<Vec<_>>());
        let output = model.forward(&batch, &device);
        let mut metric = TopOneAccuracy::default();
        model.accumulate(&mut metric, &output, &batch).unwrap();
        assert_eq!(metric.total, 10);
        assert!((0.0..=1.0).contains(&metric.value()));
    }

    #[test]
    fn test_generate_is_seeded() {
        let (a, _) = SyntheticClassification::generate(8, 2, 4, 2, 9);
        let (b, _) = SyntheticClassification::generate(8, 2, 4, 2, 9);
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.inputs, b.inputs);
    }
}
