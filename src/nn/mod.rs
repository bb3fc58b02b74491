//! Neural network building blocks for RL algorithms

pub mod mlp;

pub use mlp::{create_mlp, MLPConfig, MLP};
