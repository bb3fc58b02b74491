//! Epoch-level training API
//!
//! A [`TrainableAgent`] owns its environment and runs whole epochs:
//! collect a rollout, build batches, optimise. The metrics of every epoch are
//! returned as [`TrainingMetrics`] so callers can log or plot them.

use crate::error::Result;

/// Metrics of one training epoch
///
/// Episode statistics describe the rollout; losses and diagnostics are
/// averaged over every optimiser update of the epoch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingMetrics {
    /// Mean length of the complete episodes of the epoch
    pub avg_ep_len: f32,

    /// Mean total reward of the complete episodes of the epoch
    pub avg_ep_reward: f32,

    /// Sum of every reward of the epoch divided by `steps_per_epoch`
    pub avg_step_reward: f32,

    /// Clipped surrogate loss of the actor
    pub loss_actor: f32,

    /// Squared-error loss of the critic
    pub loss_critic: f32,

    /// Entropy of the policy (higher means more exploration)
    pub entropy: f32,

    /// Approximate KL divergence from the rollout policy
    pub approx_kl: f32,

    /// Fraction of probability ratios outside the clip range
    pub clip_fraction: f32,

    /// Number of gradient updates performed (per network)
    pub n_updates: usize,
}

/// Trait for agents trained epoch by epoch
///
/// ```ignore
/// for metrics in agent.fit(50)? {
///     println!("reward per episode: {}", metrics.avg_ep_reward);
/// }
/// ```
pub trait TrainableAgent {
    /// Run one full epoch: rollout, batching and optimisation
    fn fit_epoch(&mut self) -> Result<TrainingMetrics>;

    /// Number of epochs completed so far
    fn epoch(&self) -> usize;

    /// Total number of environment steps taken
    fn total_steps(&self) -> usize;

    /// Run `epochs` epochs, stopping at the first error
    fn fit(&mut self, epochs: usize) -> Result<Vec<TrainingMetrics>> {
        let mut history = Vec::with_capacity(epochs);
        for _ in 0..epochs {
            let metrics = self.fit_epoch()?;
            tracing::info!(
                epoch = self.epoch(),
                total_steps = self.total_steps(),
                avg_ep_len = metrics.avg_ep_len,
                avg_ep_reward = metrics.avg_ep_reward,
                avg_step_reward = metrics.avg_step_reward,
                loss_actor = metrics.loss_actor,
                loss_critic = metrics.loss_critic,
                "epoch complete"
            );
            history.push(metrics);
        }
        Ok(history)
    }
}
