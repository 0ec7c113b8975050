//! Task-model, dataset and metric interfaces.
//!
//! The trainer, the query strategies and the orchestrator only see these
//! traits. A task family plugs in by providing:
//!
//! - a [`TaskModel`]: forward pass exposing backbone features, and a loss
//!   reducible to one scalar per sample
//! - a [`PoolDataset`]: turns an ordered batch of pool indices into a
//!   host-side [`TaskBatch`]
//! - a [`TaskMetric`]: the held-out accuracy measure of the family
//!
//! Batches stay on the host and carry their pool indices; models upload them
//! to the device inside `forward`. The same batch type therefore serves both
//! the autodiff training view and the inference view of a model.

use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::config::TaskKind;
use crate::error::ALResult;

/// A host-side minibatch that remembers which pool indices it holds.
pub trait TaskBatch {
    /// Pool indices of the samples, in batch order.
    fn indices(&self) -> &[usize];

    /// Number of samples.
    fn len(&self) -> usize {
        self.indices().len()
    }

    /// Whether the batch is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a task model's forward pass.
#[derive(Debug, Clone)]
pub struct TaskOutput<B: Backend> {
    /// Task head output, `[batch, outputs]`.
    pub predictions: Tensor<B, 2>,

    /// Backbone feature levels consumed by the loss-prediction head, each
    /// `[batch, dim]`.
    pub features: Vec<Tensor<B, 2>>,
}

/// Streaming evaluation metric.
pub trait TaskMetric: Default {
    /// Short metric name for logs.
    fn name(&self) -> &'static str;

    /// Metric value over everything accumulated so far, in `[0, 1]`.
    fn value(&self) -> f64;
}

/// A trainable task model.
pub trait TaskModel<B: Backend>: Module<B> {
    /// Host-side batch type.
    type Batch: TaskBatch;

    /// Held-out metric of the task.
    type Metric: TaskMetric;

    /// Task family.
    fn kind(&self) -> TaskKind;

    /// Widths of the feature levels returned by [`TaskModel::forward`].
    fn feature_dims(&self) -> Vec<usize>;

    /// Forward pass over `batch`.
    fn forward(&self, batch: &Self::Batch, device: &B::Device) -> TaskOutput<B>;

    /// Unreduced task loss, one value per sample, shape `[batch]`.
    fn per_sample_loss(
        &self,
        output: &TaskOutput<B>,
        batch: &Self::Batch,
        device: &B::Device,
    ) -> Tensor<B, 1>;

    /// Folds one evaluated batch into `metric`.
    ///
    /// # Errors
    ///
    /// Returns a tensor-data error if predictions cannot be read back.
    fn accumulate(
        &self,
        metric: &mut Self::Metric,
        output: &TaskOutput<B>,
        batch: &Self::Batch,
    ) -> ALResult<()>;
}

/// Index-addressable dataset the pool ranges over.
pub trait PoolDataset {
    /// Batch type produced for the task model.
    type Batch: TaskBatch;

    /// Number of samples; pool indices range over `0..len()`.
    fn len(&self) -> usize;

    /// Whether the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the batch holding `indices`, in that order.
    fn batch(&self, indices: &[usize]) -> Self::Batch;
}

/// Reads a float tensor back to the host.
pub(crate) fn to_host<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> ALResult<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| crate::error::ActiveLearningError::TensorData {
            detail: format!("{e:?}"),
        })
}
