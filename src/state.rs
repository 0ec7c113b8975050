//! Training and inference views of one round's model.
//!
//! A [`TrainedState`] pairs the task model with its loss-prediction head on
//! an autodiff backend and is only ever consumed and returned by the
//! trainer. Evaluation and querying work on an [`InferenceView`], built from
//! the state with `AutodiffModule::valid()`: a gradient-free copy on the
//! inner backend. The two never alias, so evaluating cannot disturb
//! training state and vice versa.

use std::marker::PhantomData;

use burn::module::AutodiffModule;
use burn::tensor::backend::{AutodiffBackend, Backend};

use crate::error::ALResult;
use crate::loader::IndexLoader;
use crate::loss_head::LossHead;
use crate::task::{to_host, PoolDataset, TaskModel};

/// Task model and loss head under training.
#[derive(Debug, Clone)]
pub struct TrainedState<B: AutodiffBackend, M, H> {
    /// Task model (backbone and task head).
    pub model: M,
    /// Loss-prediction head.
    pub head: H,
    _backend: PhantomData<B>,
}

impl<B, M, H> TrainedState<B, M, H>
where
    B: AutodiffBackend,
    M: TaskModel<B> + AutodiffModule<B>,
    H: LossHead<B> + AutodiffModule<B>,
{
    /// Pairs a model with its head.
    pub fn new(model: M, head: H) -> Self {
        Self {
            model,
            head,
            _backend: PhantomData,
        }
    }

    /// Gradient-free copy for evaluation and querying.
    pub fn inference_view(&self) -> InferenceView<B::InnerBackend, M::InnerModule, H::InnerModule>
    where
        M::InnerModule: TaskModel<B::InnerBackend>,
        H::InnerModule: LossHead<B::InnerBackend>,
    {
        InferenceView::new(self.model.valid(), self.head.valid())
    }
}

/// Inference-only model and head.
#[derive(Debug, Clone)]
pub struct InferenceView<B: Backend, M, H> {
    /// Task model.
    pub model: M,
    /// Loss-prediction head.
    pub head: H,
    _backend: PhantomData<B>,
}

impl<B, M, H> InferenceView<B, M, H>
where
    B: Backend,
    M: TaskModel<B>,
    H: LossHead<B>,
{
    /// Wraps an inference model and head.
    pub fn new(model: M, head: H) -> Self {
        Self {
            model,
            head,
            _backend: PhantomData,
        }
    }

    /// Predicted loss for each of `indices`, in the same order.
    ///
    /// # Errors
    ///
    /// Returns a tensor-data error if predictions cannot be read back.
    pub fn predict_losses<D>(
        &self,
        dataset: &D,
        indices: &[usize],
        loader: IndexLoader,
        device: &B::Device,
    ) -> ALResult<Vec<f32>>
    where
        D: PoolDataset<Batch = M::Batch>,
    {
        let mut scores = Vec::with_capacity(indices.len());
        for chunk in loader.sequential(indices) {
            let batch = dataset.batch(&chunk);
            let output = self.model.forward(&batch, device);
            scores.extend(to_host(self.head.predict(output.features))?);
        }
        Ok(scores)
    }
}
