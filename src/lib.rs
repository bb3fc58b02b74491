//! Proximal Policy Optimization on top of [burn](https://burn.dev)
//!
//! The crate is organised around a single training loop:
//!
//! - [`env`]: the environment adapter (`reset`/`step`, space descriptors)
//! - [`gym`]: built-in environments and [`gym::make`]
//! - [`nn`]: the MLP network builder
//! - [`algo::ppo`]: agent, rollout collector, GAE, experience buffer and the
//!   clipped-surrogate optimisation step
//! - [`traits`]: tensor conversion and the [`traits::TrainableAgent`] API
//!
//! ```ignore
//! use burn::backend::{Autodiff, NdArray};
//! use ppo_rl::{algo::ppo::{PPOConfig, PPO}, traits::TrainableAgent};
//!
//! let device = Default::default();
//! let mut ppo = PPO::<Autodiff<NdArray>, _>::from_env_id("CartPole-v1", PPOConfig::new(), &device)?;
//! ppo.fit(10)?;
//! ```

pub mod algo;
pub mod env;
pub mod error;
pub mod gym;
pub mod nn;
pub mod traits;

pub use error::{Error, Result};
