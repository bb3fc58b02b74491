/// Multi-Layer Perceptron (MLP) - Generic feedforward neural network
///
/// This module provides the function approximator behind both the policy and
/// the value network. PPO only relies on `forward`; the hidden architecture is
/// whatever [`MLPConfig`] describes.

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::relu, backend::Backend},
};

/// Configuration for Multi-Layer Perceptron
#[derive(Config, Debug)]
pub struct MLPConfig {
    /// Input dimension
    pub input_dim: usize,
    /// Hidden layer dimensions (e.g., [64, 64] for two hidden layers of 64 units each)
    pub hidden_layers: Vec<usize>,
    /// Output dimension
    pub output_dim: usize,
}

/// Multi-Layer Perceptron implementation
///
/// Hidden layers use ReLU activation, the output layer is linear
#[derive(Module, Debug)]
pub struct MLP<B: Backend> {
    layers: Vec<Linear<B>>,
}

impl MLPConfig {
    /// Initialize the MLP with the given configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> MLP<B> {
        let mut dims = Vec::with_capacity(self.hidden_layers.len() + 2);
        dims.push(self.input_dim);
        dims.extend_from_slice(&self.hidden_layers);
        dims.push(self.output_dim);

        let layers = dims
            .windows(2)
            .map(|w| LinearConfig::new(w[0], w[1]).init(device))
            .collect();

        MLP { layers }
    }
}

/// Network builder: `input_dim -> hidden_layers -> output_dim`
pub fn create_mlp<B: Backend>(
    input_dim: usize,
    output_dim: usize,
    hidden_layers: &[usize],
    device: &B::Device,
) -> MLP<B> {
    MLPConfig::new(input_dim, hidden_layers.to_vec(), output_dim).init(device)
}

impl<B: Backend> MLP<B> {
    /// Generic forward pass - works with any tensor dimension
    ///
    /// The last dimension is always treated as the feature dimension:
    /// - D=1: Single example `[features]`
    /// - D=2: Batch processing `[batch, features]` (what PPO uses)
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let mut x = input;
        let Some((last, hidden)) = self.layers.split_last() else {
            return x;
        };

        for layer in hidden {
            x = relu(layer.forward(x));
        }

        last.forward(x)
    }
}
