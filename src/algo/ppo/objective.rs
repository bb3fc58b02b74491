//! Clipped surrogate objective and critic regression loss
//!
//! ```text
//! ratio         = exp(new_log_prob - old_log_prob)
//! clipped_ratio = clamp(ratio, 1 - clip, 1 + clip)
//! loss_actor    = -mean(min(ratio * adv, clipped_ratio * adv))
//! loss_critic   = mean((qval - V(state))^2)
//! ```

use burn::prelude::*;

use super::{
    agent::{states_to_tensor, ActionBatch},
    buffer::Batch,
    gae::normalize_advantages,
};
use crate::{error::Result, traits::ToTensor};

/// One batch on the training device, advantages normalised
#[derive(Debug, Clone)]
pub struct BatchTensors<B: Backend> {
    pub states: Tensor<B, 2>,
    pub actions: ActionBatch<B>,
    pub old_log_probs: Tensor<B, 1>,
    pub qvals: Tensor<B, 1>,
    pub advs: Tensor<B, 1>,
}

fn floats<B: Backend>(values: &[f32], device: &B::Device) -> Tensor<B, 1> {
    Tensor::from_data(TensorData::from(values).convert::<B::FloatElem>(), device)
}

impl<B: Backend> BatchTensors<B> {
    /// Move a batch to `device`, normalising its advantages first
    ///
    /// Batches of a single transition get zero advantages: their standard
    /// deviation is undefined.
    pub fn from_batch<S>(batch: Batch<S>, device: &B::Device) -> Result<Self>
    where
        Vec<S>: ToTensor<B, 2, Float>,
    {
        let Batch {
            states,
            actions,
            log_probs,
            qvals,
            mut advs,
        } = batch;
        normalize_advantages(&mut advs);

        Ok(Self {
            states: states_to_tensor::<B, S>(states, device),
            actions: ActionBatch::from_actions(&actions, device)?,
            old_log_probs: floats(&log_probs, device),
            qvals: floats(&qvals, device),
            advs: floats(&advs, device),
        })
    }

    pub fn len(&self) -> usize {
        self.old_log_probs.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// PPO-clip actor loss
///
/// Gradients vanish for elements where the clipped term wins the `min`.
pub fn ppo_clip_loss<B: Backend>(
    new_log_probs: Tensor<B, 1>,
    old_log_probs: Tensor<B, 1>,
    advs: Tensor<B, 1>,
    clip_ratio: f32,
) -> Tensor<B, 1> {
    let ratio = (new_log_probs - old_log_probs).exp();
    let clipped_ratio = ratio.clone().clamp(1.0 - clip_ratio, 1.0 + clip_ratio);

    let surr1 = ratio * advs.clone();
    let surr2 = clipped_ratio * advs;
    surr1.min_pair(surr2).mean().neg()
}

/// Squared-error regression of the critic towards the returns
pub fn critic_loss<B: Backend>(values: Tensor<B, 1>, qvals: Tensor<B, 1>) -> Tensor<B, 1> {
    (qvals - values).powf_scalar(2.0).mean()
}

/// `mean(old_log_prob - new_log_prob)`, an estimate of KL(old || new)
pub fn approx_kl<B: Backend>(new_log_probs: Tensor<B, 1>, old_log_probs: Tensor<B, 1>) -> f32 {
    (old_log_probs - new_log_probs).mean().into_scalar().elem::<f32>()
}

/// Share of ratios outside `[1 - clip, 1 + clip]`
pub fn clip_fraction<B: Backend>(
    new_log_probs: Tensor<B, 1>,
    old_log_probs: Tensor<B, 1>,
    clip_ratio: f32,
) -> f32 {
    let ratio = (new_log_probs - old_log_probs).exp();
    let clip_lower = ratio.clone().lower_elem(1.0 - clip_ratio);
    let clip_upper = ratio.greater_elem(1.0 + clip_ratio);
    let clipped = clip_lower.int() + clip_upper.int();
    clipped.float().mean().into_scalar().elem::<f32>()
}
