//! Proximal Policy Optimization (PPO) with Generalized Advantage Estimation
//!
//! PPO is an on-policy actor-critic algorithm. Each epoch collects a fixed
//! number of environment steps with the current policy, estimates advantages
//! with GAE over every closed episode segment, then takes several gradient
//! steps per batch on a clipped surrogate objective so the policy cannot
//! drift far from the one that collected the data.
//!
//! # Components
//!
//! - [`ActorCritic`]: policy and value networks, categorical or Gaussian
//!   action distribution
//! - [`RolloutCollector`]: lazy, per-epoch trajectory collection
//! - [`AdvantageEstimator`]: discounted returns and GAE-λ
//! - [`ExperienceBuffer`]: per-epoch storage drained into ordered batches
//! - [`objective`]: clipped actor loss, critic loss and diagnostics
//! - [`PPO`]: the optimiser schedule, one Adam instance per network
//!
//! # Usage Example
//!
//! ```ignore
//! use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
//! use ppo_rl::algo::ppo::{PPOConfig, PPO};
//! use ppo_rl::traits::TrainableAgent;
//!
//! let config = PPOConfig::new().with_steps_per_epoch(4096).with_seed(Some(7));
//! let mut ppo = PPO::<Autodiff<NdArray>, _>::from_env_id("CartPole-v1", config, &NdArrayDevice::default())?;
//! for metrics in ppo.fit(50)? {
//!     println!("{:.1}", metrics.avg_ep_reward);
//! }
//! ```
//!
//! # Tips
//!
//! - `batch_size` must be greater than 1, advantages are normalised per batch
//! - an epoch should contain at least one complete episode, otherwise the
//!   episode averages are carried over from the previous epoch
//! - watch `approx_kl` and `clip_fraction`: large values mean the learning
//!   rate or `nb_optim_iters` is too high
//!
//! Reference: "Proximal Policy Optimization Algorithms" (Schulman et al., 2017)

mod agent;
mod buffer;
mod config;
mod gae;
pub mod objective;
mod rollout;
mod trainer;

pub use agent::{
    states_to_tensor, ActOutput, ActionBatch, ActionDistribution, ActionKind, Actor, ActorCritic,
};
pub use buffer::{Batch, ExperienceBuffer};
pub use config::PPOConfig;
pub use gae::{discounted_returns, normalize_advantages, AdvantageEstimator};
pub use rollout::{
    AnnotatedTransition, CloseReason, EpochRollout, RollingStats, RolloutCollector, Transition,
};
pub use trainer::PPO;
