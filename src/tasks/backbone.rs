//! Two-layer MLP backbone shared by the reference task models.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Configuration of [`MlpBackbone`].
#[derive(Config, Debug)]
pub struct MlpBackboneConfig {
    /// Input width.
    pub input_dim: usize,
    /// Width of the first hidden layer.
    #[config(default = 64)]
    pub hidden1: usize,
    /// Width of the second hidden layer.
    #[config(default = 32)]
    pub hidden2: usize,
}

impl MlpBackboneConfig {
    /// Initializes a backbone on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> MlpBackbone<B> {
        MlpBackbone {
            fc1: LinearConfig::new(self.input_dim, self.hidden1).init(device),
            fc2: LinearConfig::new(self.hidden1, self.hidden2).init(device),
        }
    }

    /// Widths of the two feature levels.
    #[must_use]
    pub fn feature_dims(&self) -> Vec<usize> {
        vec![self.hidden1, self.hidden2]
    }
}

/// `Linear → ReLU → Linear → ReLU`, exposing both activations.
#[derive(Module, Debug)]
pub struct MlpBackbone<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
}

impl<B: Backend> MlpBackbone<B> {
    /// Returns `[h1, h2]`; the task head reads `h2`.
    pub fn forward(&self, input: Tensor<B, 2>) -> [Tensor<B, 2>; 2] {
        let h1 = relu(self.fc1.forward(input));
        let h2 = relu(self.fc2.forward(h1.clone()));
        [h1, h2]
    }

    /// Widths of `[h1, h2]`.
    pub fn feature_dims(&self) -> Vec<usize> {
        vec![self.fc1.weight.val().dims()[1], self.fc2.weight.val().dims()[1]]
    }

    /// Parameters of the first layer, for gradient inspection.
    pub fn first_layer(&self) -> &Linear<B> {
        &self.fc1
    }
}
