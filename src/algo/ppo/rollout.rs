//! Rollout collection
//!
//! [`RolloutCollector`] owns the environment and the current state. Each call
//! to [`RolloutCollector::collect_epoch`] returns an [`EpochRollout`], a lazy
//! iterator that steps the environment `steps_per_epoch` times and yields
//! advantage-annotated transitions as episode segments close.
//!
//! A segment closes for exactly one reason, checked in this order:
//! 1. the environment reports `done` ([`CloseReason::Terminated`])
//! 2. the segment reached `max_episode_len` ([`CloseReason::Truncated`])
//! 3. the epoch's last step was taken ([`CloseReason::Cutoff`])
//!
//! Only terminated segments bootstrap from 0. After a cutoff the environment
//! is not reset, so the next epoch continues the same episode: its length and
//! reward keep accumulating on the collector, and truncation is measured
//! against the whole episode rather than the current segment.

use std::collections::VecDeque;

use burn::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, warn};

use super::{gae::AdvantageEstimator, ActorCritic, PPOConfig};
use crate::{
    env::{Action, Environment},
    error::Result,
    traits::ToTensor,
};

/// One environment step as recorded during rollout
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    pub state: S,
    pub action: Action,
    pub log_prob: f32,
    /// Critic estimate of `state`
    pub value: f32,
    pub reward: f32,
}

impl<S> Transition<S> {
    fn annotate(self, qval: f32, adv: f32) -> AnnotatedTransition<S> {
        AnnotatedTransition {
            state: self.state,
            action: self.action,
            log_prob: self.log_prob,
            value: self.value,
            reward: self.reward,
            qval,
            adv,
        }
    }
}

/// A transition extended with its return-to-go and GAE advantage
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedTransition<S> {
    pub state: S,
    pub action: Action,
    pub log_prob: f32,
    pub value: f32,
    pub reward: f32,
    pub qval: f32,
    pub adv: f32,
}

/// Why an episode segment was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Terminated,
    Truncated,
    Cutoff,
}

impl CloseReason {
    /// Truncated segments count as complete episodes, cut-off ones do not
    pub fn is_complete(self) -> bool {
        self != CloseReason::Cutoff
    }
}

/// Episode statistics of the last collected epoch
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollingStats {
    pub avg_ep_len: f32,
    pub avg_ep_reward: f32,
    pub avg_step_reward: f32,
}

/// Drives one environment with the agent's current policy
pub struct RolloutCollector<E: Environment> {
    env: E,
    /// `None` until the first reset
    state: Option<E::State>,
    /// Length and reward of the running episode, carried across cutoffs
    ep_len: usize,
    ep_reward: f32,
    estimator: AdvantageEstimator,
    max_episode_len: usize,
    steps_per_epoch: usize,
    stats: RollingStats,
    total_steps: usize,
    rng: StdRng,
}

impl<E: Environment> RolloutCollector<E> {
    pub fn new(env: E, config: &PPOConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            env,
            state: None,
            ep_len: 0,
            ep_reward: 0.0,
            estimator: AdvantageEstimator::new(config.gamma, config.lam),
            max_episode_len: config.max_episode_len,
            steps_per_epoch: config.steps_per_epoch,
            stats: RollingStats::default(),
            total_steps: 0,
            rng,
        }
    }

    /// Start an epoch rollout with a read-only view of the agent
    ///
    /// The returned iterator is not restartable: dropping it before the end
    /// leaves the statistics of the previous epoch in place.
    pub fn collect_epoch<'a, B: Backend>(
        &'a mut self,
        agent: &'a ActorCritic<B>,
    ) -> EpochRollout<'a, E, B> {
        EpochRollout {
            collector: self,
            agent,
            segment: Vec::new(),
            pending: VecDeque::new(),
            tally: EpochTally::default(),
            steps: 0,
            finished: false,
        }
    }

    pub fn stats(&self) -> RollingStats {
        self.stats
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn env(&self) -> &E {
        &self.env
    }
}

#[derive(Debug, Default)]
struct EpochTally {
    ep_lens: Vec<usize>,
    ep_rewards: Vec<f32>,
    reward_sum: f32,
}

/// Lazy rollout of one epoch, see [`RolloutCollector::collect_epoch`]
pub struct EpochRollout<'a, E: Environment, B: Backend> {
    collector: &'a mut RolloutCollector<E>,
    agent: &'a ActorCritic<B>,
    segment: Vec<Transition<E::State>>,
    pending: VecDeque<AnnotatedTransition<E::State>>,
    tally: EpochTally,
    steps: usize,
    finished: bool,
}

impl<E, B> EpochRollout<'_, E, B>
where
    E: Environment,
    B: Backend,
    Vec<E::State>: ToTensor<B, 2, Float>,
{
    /// Take one environment step, closing the segment if needed
    fn step(&mut self) -> Result<()> {
        let c = &mut *self.collector;
        let state = match c.state.take() {
            Some(state) => state,
            None => {
                c.ep_len = 0;
                c.ep_reward = 0.0;
                c.env.reset()?
            }
        };

        let out = self.agent.act(&state, &mut c.rng)?;
        let step = c.env.step(&out.action)?;
        c.total_steps += 1;
        c.ep_len += 1;
        c.ep_reward += step.reward;
        self.steps += 1;
        self.tally.reward_sum += step.reward;

        self.segment.push(Transition {
            state,
            action: out.action,
            log_prob: out.log_prob,
            value: out.value,
            reward: step.reward,
        });

        let reason = if step.done {
            Some(CloseReason::Terminated)
        } else if c.ep_len >= c.max_episode_len {
            Some(CloseReason::Truncated)
        } else if self.steps == c.steps_per_epoch {
            Some(CloseReason::Cutoff)
        } else {
            None
        };

        let Some(reason) = reason else {
            c.state = Some(step.next_state);
            return Ok(());
        };

        let bootstrap = match reason {
            CloseReason::Terminated => 0.0,
            _ => self.agent.value(&step.next_state),
        };
        self.close_segment(reason, bootstrap);

        let c = &mut *self.collector;
        if reason.is_complete() {
            self.tally.ep_lens.push(c.ep_len);
            self.tally.ep_rewards.push(c.ep_reward);
        }
        c.state = Some(match reason {
            CloseReason::Cutoff => step.next_state,
            _ => {
                c.ep_len = 0;
                c.ep_reward = 0.0;
                c.env.reset()?
            }
        });

        Ok(())
    }

    fn close_segment(&mut self, reason: CloseReason, bootstrap: f32) {
        let segment = std::mem::take(&mut self.segment);
        let rewards: Vec<f32> = segment.iter().map(|t| t.reward).collect();
        let values: Vec<f32> = segment.iter().map(|t| t.value).collect();

        let estimator = self.collector.estimator;
        let qvals = estimator.returns(&rewards, bootstrap);
        let advs = estimator.gae(&rewards, &values, bootstrap);

        debug!(
            ?reason,
            len = segment.len(),
            ep_len = self.collector.ep_len,
            ep_reward = self.collector.ep_reward,
            bootstrap,
            "episode segment closed"
        );

        self.pending.extend(
            segment
                .into_iter()
                .zip(qvals.into_iter().zip(advs))
                .map(|(t, (qval, adv))| t.annotate(qval, adv)),
        );
    }

    /// Fold the epoch's tally into the collector statistics
    fn finish(&mut self) {
        let tally = std::mem::take(&mut self.tally);
        let c = &mut *self.collector;

        c.stats.avg_step_reward = tally.reward_sum / c.steps_per_epoch as f32;

        let n_episodes = tally.ep_lens.len();
        if n_episodes == 0 {
            warn!(
                steps_per_epoch = c.steps_per_epoch,
                "no complete episode this epoch, keeping previous episode averages"
            );
        } else {
            c.stats.avg_ep_len = tally.ep_lens.iter().sum::<usize>() as f32 / n_episodes as f32;
            c.stats.avg_ep_reward = tally.ep_rewards.iter().sum::<f32>() / n_episodes as f32;
        }

        self.finished = true;
    }
}

impl<E, B> Iterator for EpochRollout<'_, E, B>
where
    E: Environment,
    B: Backend,
    Vec<E::State>: ToTensor<B, 2, Float>,
{
    type Item = Result<AnnotatedTransition<E::State>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(t) = self.pending.pop_front() {
                return Some(Ok(t));
            }
            if self.finished {
                return None;
            }
            if self.steps >= self.collector.steps_per_epoch {
                self.finish();
                return None;
            }
            if let Err(e) = self.step() {
                // The epoch is aborted, the statistics stay untouched
                self.finished = true;
                return Some(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        env::{Report, Space, Step},
        error::Error,
    };
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    /// Counts steps; `done` after `episode_len` steps when set
    struct Counter {
        t: usize,
        episode_len: Option<usize>,
        resets: usize,
        /// Total `step` calls
        calls: usize,
        /// `step` call that fails, 1-based
        fail_at: Option<usize>,
    }

    impl Counter {
        fn new(episode_len: Option<usize>) -> Self {
            Self {
                t: 0,
                episode_len,
                resets: 0,
                calls: 0,
                fail_at: None,
            }
        }
    }

    impl Environment for Counter {
        type State = [f32; 1];

        fn observation_space(&self) -> Space {
            Space::Box {
                low: vec![0.0],
                high: vec![f32::MAX],
            }
        }

        fn action_space(&self) -> Space {
            Space::Discrete(2)
        }

        fn reset(&mut self) -> Result<Self::State> {
            self.t = 0;
            self.resets += 1;
            Ok([0.0])
        }

        fn step(&mut self, _action: &Action) -> Result<Step<Self::State>> {
            self.calls += 1;
            if self.fail_at == Some(self.calls) {
                return Err(Error::Environment("simulation diverged".to_string()));
            }
            self.t += 1;
            Ok(Step {
                next_state: [self.t as f32],
                reward: 1.0,
                done: self.episode_len.is_some_and(|n| self.t >= n),
                info: Report::default(),
            })
        }
    }

    fn setup(
        env: Counter,
        config: &PPOConfig,
    ) -> (RolloutCollector<Counter>, ActorCritic<NdArray>) {
        let device = NdArrayDevice::default();
        let agent = ActorCritic::new(
            &env.observation_space(),
            &env.action_space(),
            config,
            &device,
        )
        .unwrap();
        (RolloutCollector::new(env, config), agent)
    }

    fn collect(
        collector: &mut RolloutCollector<Counter>,
        agent: &ActorCritic<NdArray>,
    ) -> Vec<AnnotatedTransition<[f32; 1]>> {
        collector
            .collect_epoch(agent)
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn two_complete_episodes_per_epoch() {
        let config = PPOConfig::new()
            .with_steps_per_epoch(4)
            .with_max_episode_len(2)
            .with_seed(Some(0));
        let (mut collector, agent) = setup(Counter::new(Some(2)), &config);

        let batch = collect(&mut collector, &agent);
        assert_eq!(batch.len(), 4);

        let stats = collector.stats();
        assert_eq!(stats.avg_step_reward, 1.0);
        assert_eq!(stats.avg_ep_reward, 2.0);
        assert_eq!(stats.avg_ep_len, 2.0);
        assert_eq!(collector.total_steps(), 4);
    }

    #[test]
    fn terminated_segment_bootstraps_from_zero() {
        let config = PPOConfig::new()
            .with_steps_per_epoch(2)
            .with_gamma(0.9)
            .with_seed(Some(1));
        let (mut collector, agent) = setup(Counter::new(Some(2)), &config);

        let batch = collect(&mut collector, &agent);
        // Last step of a terminated segment: qval is the reward alone
        assert_eq!(batch[1].qval, 1.0);
        assert!((batch[0].qval - 1.9).abs() < 1e-6);
    }

    #[test]
    fn truncated_and_cutoff_segments_bootstrap_from_critic() {
        let config = PPOConfig::new()
            .with_steps_per_epoch(5)
            .with_max_episode_len(3)
            .with_gamma(0.9)
            .with_seed(Some(2));
        let (mut collector, agent) = setup(Counter::new(None), &config);

        let batch = collect(&mut collector, &agent);
        assert_eq!(batch.len(), 5);

        // Truncated after 3 steps at state [3], cut off after 2 more at state [2]
        let truncated = 1.0 + 0.9 * agent.value(&[3.0_f32]);
        let cutoff = 1.0 + 0.9 * agent.value(&[2.0_f32]);
        assert!((batch[2].qval - truncated).abs() < 1e-5);
        assert!((batch[4].qval - cutoff).abs() < 1e-5);

        // Only the truncated segment is a complete episode
        let stats = collector.stats();
        assert_eq!(stats.avg_ep_len, 3.0);
        assert_eq!(stats.avg_ep_reward, 3.0);
        assert_eq!(stats.avg_step_reward, 1.0);
    }

    #[test]
    fn state_persists_across_cutoff() {
        let config = PPOConfig::new()
            .with_steps_per_epoch(3)
            .with_seed(Some(3));
        let (mut collector, agent) = setup(Counter::new(None), &config);

        let first = collect(&mut collector, &agent);
        let second = collect(&mut collector, &agent);

        assert_eq!(first[0].state, [0.0]);
        assert_eq!(second[0].state, [3.0]);
        assert_eq!(collector.env().resets, 1);
    }

    #[test]
    fn epoch_without_complete_episode_keeps_episode_averages() {
        let config = PPOConfig::new()
            .with_steps_per_epoch(2)
            .with_max_episode_len(2)
            .with_seed(Some(4));
        let (mut collector, agent) = setup(Counter::new(None), &config);

        collect(&mut collector, &agent);
        assert_eq!(collector.stats().avg_ep_len, 2.0);

        // A single-step epoch can only end by cutoff
        collector.steps_per_epoch = 1;
        collect(&mut collector, &agent);
        let stats = collector.stats();
        assert_eq!(stats.avg_ep_len, 2.0);
        assert_eq!(stats.avg_ep_reward, 2.0);
        assert_eq!(stats.avg_step_reward, 1.0);
    }

    #[test]
    fn episode_split_by_cutoff_counts_once() {
        let config = PPOConfig::new()
            .with_steps_per_epoch(3)
            .with_seed(Some(5));
        let (mut collector, agent) = setup(Counter::new(Some(4)), &config);

        // Cut off after 3 steps, no episode finished yet
        collect(&mut collector, &agent);
        assert_eq!(collector.stats().avg_ep_len, 0.0);

        // The 4th step terminates the episode started last epoch
        let second = collect(&mut collector, &agent);
        assert_eq!(second[0].state, [3.0]);
        assert_eq!(second[0].qval, 1.0);

        let stats = collector.stats();
        assert_eq!(stats.avg_ep_len, 4.0);
        assert_eq!(stats.avg_ep_reward, 4.0);
        assert_eq!(collector.env().resets, 2);
    }

    #[test]
    fn truncation_counts_steps_before_cutoff() {
        let config = PPOConfig::new()
            .with_steps_per_epoch(2)
            .with_max_episode_len(3)
            .with_seed(Some(6));
        let (mut collector, agent) = setup(Counter::new(None), &config);

        collect(&mut collector, &agent);
        assert_eq!(collector.env().resets, 1);

        // One more step reaches max_episode_len over the whole episode
        let second = collect(&mut collector, &agent);
        assert_eq!(second[0].state, [2.0]);
        assert_eq!(second[1].state, [0.0]);
        assert_eq!(collector.env().resets, 2);

        let stats = collector.stats();
        assert_eq!(stats.avg_ep_len, 3.0);
        assert_eq!(stats.avg_ep_reward, 3.0);
    }

    #[test]
    fn environment_error_aborts_epoch() {
        let config = PPOConfig::new()
            .with_steps_per_epoch(4)
            .with_max_episode_len(2)
            .with_seed(Some(7));
        let (mut collector, agent) = setup(Counter::new(None), &config);

        collect(&mut collector, &agent);
        let before = collector.stats();
        assert_eq!(before.avg_ep_len, 2.0);
        assert_eq!(collector.env().resets, 3);

        // Second step of the next epoch fails
        collector.env.fail_at = Some(6);
        let rollout = collector.collect_epoch(&agent).collect::<Result<Vec<_>>>();
        assert!(matches!(rollout, Err(Error::Environment(_))));
        assert_eq!(collector.stats(), before);
        assert_eq!(collector.total_steps(), 5);

        // The next epoch restarts from a fresh episode
        collector.env.fail_at = None;
        let third = collect(&mut collector, &agent);
        assert_eq!(third[0].state, [0.0]);
        // One restart, then two truncated episodes
        assert_eq!(collector.env().resets, 6);
        assert_eq!(third.len(), 4);
        assert_eq!(collector.stats().avg_ep_len, 2.0);
    }
}
