//! Loss-prediction head.
//!
//! The head reads the backbone's intermediate features and regresses one
//! scalar per sample that is trained, through the margin ranking loss, to
//! order samples by their true task loss.
//!
//! # Architecture
//!
//! ```text
//! feature level k: [batch, d_k] ──Linear(d_k → interm)──ReLU──┐
//!                                                            ├─concat──Linear(K·interm → 1)── [batch]
//! feature level k+1 ...                                   ───┘
//! ```

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Predicts a per-sample loss from backbone features.
pub trait LossHead<B: Backend>: Module<B> {
    /// Predicted loss per sample, shape `[batch]`.
    fn predict(&self, features: Vec<Tensor<B, 2>>) -> Tensor<B, 1>;
}

/// Configuration of [`LossNet`].
#[derive(Config, Debug)]
pub struct LossNetConfig {
    /// Width of each backbone feature level.
    pub feature_dims: Vec<usize>,
    /// Width of the per-level projection.
    #[config(default = 128)]
    pub interm_dim: usize,
}

impl LossNetConfig {
    /// Initializes a head on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> LossNet<B> {
        let branches = self
            .feature_dims
            .iter()
            .map(|&dim| LinearConfig::new(dim, self.interm_dim).init(device))
            .collect();
        let out = LinearConfig::new(self.interm_dim * self.feature_dims.len().max(1), 1).init(device);
        LossNet { branches, out }
    }
}

/// Reference loss-prediction head: one projection per feature level.
#[derive(Module, Debug)]
pub struct LossNet<B: Backend> {
    branches: Vec<Linear<B>>,
    out: Linear<B>,
}

impl<B: Backend> LossNet<B> {
    /// Number of feature levels the head expects.
    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.branches.len()
    }
}

impl<B: Backend> LossHead<B> for LossNet<B> {
    fn predict(&self, features: Vec<Tensor<B, 2>>) -> Tensor<B, 1> {
        debug_assert_eq!(features.len(), self.branches.len());
        let projected: Vec<Tensor<B, 2>> = self
            .branches
            .iter()
            .zip(features)
            .map(|(branch, feature)| relu(branch.forward(feature)))
            .collect();
        let joined = Tensor::cat(projected, 1);
        let [batch, _] = joined.dims();
        self.out.forward(joined).reshape([batch])
    }
}

#[cfg(all(test, feature = "ndarray"))]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_predicts_one_value_per_sample() {
        let device = Default::default();
        let head = LossNetConfig::new(vec![6, 4])
            .with_interm_dim(8)
            .init::<TestBackend>(&device);
        assert_eq!(head.num_levels(), 2);

        let features = vec![
            Tensor::<TestBackend, 2>::ones([5, 6], &device),
            Tensor::<TestBackend, 2>::zeros([5, 4], &device),
        ];
        assert_eq!(head.predict(features).dims(), [5]);
    }
}
