//! PPO training driver: rollout, batching and the two optimisers

use burn::{
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use tracing::{debug, info};

use super::{
    agent::{Actor, ActorCritic},
    buffer::ExperienceBuffer,
    objective::{approx_kl, clip_fraction, critic_loss, ppo_clip_loss, BatchTensors},
    rollout::RolloutCollector,
    PPOConfig,
};
use crate::{
    env::Environment,
    error::Result,
    gym::{self, GymEnv},
    nn::MLP,
    traits::{ToTensor, TrainableAgent, TrainingMetrics},
};

/// Diagnostics of one actor update
#[derive(Debug, Clone, Copy, Default)]
struct ActorStep {
    loss: f32,
    entropy: f32,
    approx_kl: f32,
    clip_fraction: f32,
}

/// Proximal Policy Optimization trainer
///
/// Owns the environment (through its [`RolloutCollector`]), the agent and
/// one Adam optimiser per network. Every epoch runs:
///
/// 1. COLLECT: `steps_per_epoch` environment steps with the current policy
/// 2. BUILD_BATCHES: consecutive batches of `batch_size`, in rollout order
/// 3. OPTIMIZE: `nb_optim_iters` actor steps and critic steps per batch
///
/// ```ignore
/// let device = NdArrayDevice::default();
/// let mut ppo = PPO::<Autodiff<NdArray>, _>::new(CartPole::new(), PPOConfig::new(), &device)?;
/// let history = ppo.fit(20)?;
/// ```
pub struct PPO<B, E>
where
    B: AutodiffBackend,
    E: Environment,
{
    config: PPOConfig,
    agent: ActorCritic<B>,
    collector: RolloutCollector<E>,
    buffer: ExperienceBuffer<E::State>,

    // Optimizers (stored to keep their moment estimates across epochs)
    optimizer_actor: OptimizerAdaptor<Adam, Actor<B>, B>,
    optimizer_critic: OptimizerAdaptor<Adam, MLP<B>, B>,

    device: B::Device,
    epoch: usize,
}

impl<B, E> PPO<B, E>
where
    B: AutodiffBackend,
    E: Environment,
{
    /// Build a trainer for `env`
    ///
    /// Fails if the configuration is invalid or the action space is neither
    /// `Discrete` nor `Box`.
    pub fn new(env: E, config: PPOConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        if let Some(seed) = config.seed {
            B::seed(seed);
        }

        let agent = ActorCritic::new(
            &env.observation_space(),
            &env.action_space(),
            &config,
            device,
        )?;
        let collector = RolloutCollector::new(env, &config);

        info!(
            action = ?agent.kind(),
            hidden_layers = ?config.hidden_layers,
            steps_per_epoch = config.steps_per_epoch,
            batch_size = config.batch_size,
            "PPO trainer ready"
        );

        Ok(Self {
            optimizer_actor: AdamConfig::new().with_epsilon(1e-8).init(),
            optimizer_critic: AdamConfig::new().with_epsilon(1e-8).init(),
            config,
            agent,
            collector,
            buffer: ExperienceBuffer::new(),
            device: device.clone(),
            epoch: 0,
        })
    }

    /// Current policy and value networks
    ///
    /// Use [`ActorCritic::valid`] for evaluation, or `into_record` on its
    /// modules for checkpoints.
    pub fn agent(&self) -> &ActorCritic<B> {
        &self.agent
    }

    pub fn config(&self) -> &PPOConfig {
        &self.config
    }

    pub fn env(&self) -> &E {
        self.collector.env()
    }
}

impl<B: AutodiffBackend> PPO<B, GymEnv> {
    /// Build a trainer for a built-in environment, see [`gym::make`]
    pub fn from_env_id(id: &str, config: PPOConfig, device: &B::Device) -> Result<Self> {
        Self::new(gym::make(id)?, config, device)
    }
}

impl<B, E> PPO<B, E>
where
    B: AutodiffBackend,
    E: Environment,
    Vec<E::State>: ToTensor<B, 2, Float> + ToTensor<B::InnerBackend, 2, Float>,
{
    /// One gradient step of the policy on `batch`
    fn actor_step(&mut self, batch: &BatchTensors<B>) -> Result<ActorStep> {
        let actor = self.agent.actor.clone();
        let pi = actor.distribution(batch.states.clone());
        let new_log_probs = pi.log_prob(batch.actions.clone())?;

        let loss = ppo_clip_loss(
            new_log_probs.clone(),
            batch.old_log_probs.clone(),
            batch.advs.clone(),
            self.config.clip_ratio,
        );

        // Extract metrics before backward pass
        let new_log_probs = new_log_probs.detach();
        let stats = ActorStep {
            loss: loss.clone().into_scalar().elem::<f32>(),
            entropy: pi.entropy().mean().into_scalar().elem::<f32>(),
            approx_kl: approx_kl(new_log_probs.clone(), batch.old_log_probs.clone()),
            clip_fraction: clip_fraction(
                new_log_probs,
                batch.old_log_probs.clone(),
                self.config.clip_ratio,
            ),
        };

        let grads = GradientsParams::from_grads(loss.backward(), &actor);
        self.agent.actor = self
            .optimizer_actor
            .step(self.config.lr_actor, actor, grads);

        Ok(stats)
    }

    /// One gradient step of the value network on `batch`
    fn critic_step(&mut self, batch: &BatchTensors<B>) -> f32 {
        let critic = self.agent.critic.clone();
        let values = critic.forward(batch.states.clone()).squeeze::<1>(1);
        let loss = critic_loss(values, batch.qvals.clone());
        let loss_val = loss.clone().into_scalar().elem::<f32>();

        let grads = GradientsParams::from_grads(loss.backward(), &critic);
        self.agent.critic = self
            .optimizer_critic
            .step(self.config.lr_critic, critic, grads);

        loss_val
    }
}

impl<B, E> TrainableAgent for PPO<B, E>
where
    B: AutodiffBackend,
    E: Environment,
    Vec<E::State>: ToTensor<B, 2, Float> + ToTensor<B::InnerBackend, 2, Float>,
{
    fn fit_epoch(&mut self) -> Result<TrainingMetrics> {
        // COLLECT, on a gradient-free copy of the agent
        let rollout_agent = self.agent.valid();
        let collected = self
            .buffer
            .fill(self.collector.collect_epoch(&rollout_agent))?;
        let stats = self.collector.stats();

        // BUILD_BATCHES
        let batches = self.buffer.drain_batches(self.config.batch_size);
        debug!(transitions = collected, batches = batches.len(), "epoch rollout collected");

        // OPTIMIZE
        let mut totals = TrainingMetrics::default();
        for batch in batches {
            let batch = BatchTensors::<B>::from_batch(batch, &self.device)?;

            for _ in 0..self.config.nb_optim_iters {
                let actor = self.actor_step(&batch)?;
                let loss_critic = self.critic_step(&batch);

                debug!(
                    loss_actor = actor.loss,
                    loss_critic,
                    entropy = actor.entropy,
                    approx_kl = actor.approx_kl,
                    clip_fraction = actor.clip_fraction,
                    avg_ep_len = stats.avg_ep_len,
                    avg_ep_reward = stats.avg_ep_reward,
                    avg_step_reward = stats.avg_step_reward,
                    "optimisation step"
                );

                totals.loss_actor += actor.loss;
                totals.loss_critic += loss_critic;
                totals.entropy += actor.entropy;
                totals.approx_kl += actor.approx_kl;
                totals.clip_fraction += actor.clip_fraction;
                totals.n_updates += 1;
            }
        }

        self.epoch += 1;

        let n = totals.n_updates.max(1) as f32;
        Ok(TrainingMetrics {
            avg_ep_len: stats.avg_ep_len,
            avg_ep_reward: stats.avg_ep_reward,
            avg_step_reward: stats.avg_step_reward,
            loss_actor: totals.loss_actor / n,
            loss_critic: totals.loss_critic / n,
            entropy: totals.entropy / n,
            approx_kl: totals.approx_kl / n,
            clip_fraction: totals.clip_fraction / n,
            n_updates: totals.n_updates,
        })
    }

    fn epoch(&self) -> usize {
        self.epoch
    }

    fn total_steps(&self) -> usize {
        self.collector.total_steps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        env::{Action, Report, Space, Step},
        error::Error,
        gym::Pendulum,
    };
    use burn::backend::{
        ndarray::{NdArray, NdArrayDevice},
        Autodiff,
    };

    type AD = Autodiff<NdArray>;

    /// Two-armed bandit: action 1 pays 1, action 0 pays 0, episodes last one step
    struct Bandit;

    impl Environment for Bandit {
        type State = [f32; 2];

        fn observation_space(&self) -> Space {
            Space::Box {
                low: vec![0.0; 2],
                high: vec![1.0; 2],
            }
        }

        fn action_space(&self) -> Space {
            Space::Discrete(2)
        }

        fn reset(&mut self) -> Result<Self::State> {
            Ok([1.0, 0.0])
        }

        fn step(&mut self, action: &Action) -> Result<Step<Self::State>> {
            let reward = match action {
                Action::Discrete(1) => 1.0,
                Action::Discrete(_) => 0.0,
                other => return Err(Error::InvalidAction(format!("{other:?}"))),
            };
            Ok(Step {
                next_state: [1.0, 0.0],
                reward,
                done: true,
                info: Report::default(),
            })
        }
    }

    fn small_config() -> PPOConfig {
        PPOConfig::new()
            .with_steps_per_epoch(32)
            .with_batch_size(16)
            .with_nb_optim_iters(2)
            .with_hidden_layers(vec![16])
            .with_seed(Some(42))
    }

    #[test]
    fn rejects_invalid_config() {
        let device = NdArrayDevice::default();
        let res = PPO::<AD, _>::new(Bandit, small_config().with_lam(2.0), &device);
        assert!(matches!(res, Err(Error::InvalidConfig { field: "lam", .. })));
    }

    #[test]
    fn unknown_env_id() {
        let device = NdArrayDevice::default();
        let res = PPO::<AD, GymEnv>::from_env_id("Nope-v0", small_config(), &device);
        assert!(matches!(res, Err(Error::MissingEnvironment { .. })));
    }

    #[test]
    fn fit_epoch_counts_updates_and_steps() {
        let device = NdArrayDevice::default();
        let mut ppo = PPO::<AD, _>::new(Bandit, small_config(), &device).unwrap();

        let metrics = ppo.fit_epoch().unwrap();
        // 2 batches of 16, 2 iterations each
        assert_eq!(metrics.n_updates, 4);
        assert_eq!(ppo.epoch(), 1);
        assert_eq!(ppo.total_steps(), 32);
        assert_eq!(metrics.avg_ep_len, 1.0);
        assert!(metrics.loss_actor.is_finite());
        assert!(metrics.loss_critic >= 0.0);
        assert!(metrics.entropy > 0.0 && metrics.entropy <= 2.0_f32.ln() + 1e-5);
    }

    #[test]
    fn learns_the_bandit() {
        let device = NdArrayDevice::default();
        let config = small_config().with_lr_actor(3e-2).with_lr_critic(1e-2);
        let mut ppo = PPO::<AD, _>::new(Bandit, config, &device).unwrap();

        let history = ppo.fit(25).unwrap();
        assert_eq!(history.len(), 25);

        let first = history[0].avg_step_reward;
        let last = history[22..].iter().map(|m| m.avg_step_reward).sum::<f32>() / 3.0;
        assert!(last > 0.7, "reward went from {first} to {last}");
    }

    #[test]
    fn critic_fits_returns() {
        let device = NdArrayDevice::default();
        let config = small_config().with_lr_critic(1e-2);
        let mut ppo = PPO::<AD, _>::new(Bandit, config, &device).unwrap();

        let first = ppo.fit_epoch().unwrap().loss_critic;
        let last = ppo.fit(10).unwrap().last().map(|m| m.loss_critic).unwrap();
        assert!(last < first, "critic loss went from {first} to {last}");
    }

    #[test]
    fn gaussian_policy_trains_on_pendulum() {
        let device = NdArrayDevice::default();
        let config = small_config().with_max_episode_len(8);
        let mut ppo = PPO::<AD, _>::new(Pendulum::with_seed(0), config, &device).unwrap();

        let metrics = ppo.fit_epoch().unwrap();
        assert_eq!(metrics.n_updates, 4);
        assert_eq!(metrics.avg_ep_len, 8.0);
        assert!(metrics.avg_step_reward < 0.0);
        assert!(metrics.loss_actor.is_finite());
    }
}
