//! Policy/value agent
//!
//! [`ActorCritic`] pairs a policy network ([`Actor`]) with a value network.
//! The action distribution is picked once, from the action space, when the
//! agent is built:
//! - `Discrete(n)`: categorical over the `n` logits of the policy network
//! - `Box`: diagonal Gaussian, mean from the policy network and a learned,
//!   state independent `log_std`
//!
//! The same [`Actor::distribution`] path serves rollout (on the inner,
//! gradient-free backend) and optimisation (on the autodiff backend).

use std::f32::consts::PI;

use burn::{
    module::{AutodiffModule, Param},
    prelude::*,
    tensor::{
        activation::{log_softmax, softmax},
        backend::AutodiffBackend,
    },
};
use rand::{distributions::Distribution, distributions::WeightedIndex, Rng};
use rand_distr::StandardNormal;

use super::PPOConfig;
use crate::{
    env::{Action, Space},
    error::{Error, Result},
    nn::{create_mlp, MLP},
    traits::ToTensor,
};

/// Convert a batch of states into a `[batch, features]` float tensor
///
/// Spelled out so callers holding `ToTensor` bounds for several backends
/// pick the right one.
pub fn states_to_tensor<B, S>(states: Vec<S>, device: &B::Device) -> Tensor<B, 2>
where
    B: Backend,
    Vec<S>: ToTensor<B, 2, Float>,
{
    <Vec<S> as ToTensor<B, 2, Float>>::to_tensor(states, device)
}

/// Kind of action distribution, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Categorical { n: usize },
    Gaussian { dim: usize },
}

impl ActionKind {
    pub fn from_space(space: &Space) -> Result<Self> {
        match space {
            Space::Discrete(n) => Ok(ActionKind::Categorical { n: *n }),
            Space::Box { low, .. } => Ok(ActionKind::Gaussian { dim: low.len() }),
            other => Err(Error::UnsupportedActionSpace(other.name().to_string())),
        }
    }

    /// Number of outputs of the policy network
    pub fn output_dim(&self) -> usize {
        match self {
            ActionKind::Categorical { n } => *n,
            ActionKind::Gaussian { dim } => *dim,
        }
    }
}

/// Policy network
#[derive(Module, Debug)]
pub struct Actor<B: Backend> {
    net: MLP<B>,
    log_std: Option<Param<Tensor<B, 1>>>,
}

impl<B: Backend> Actor<B> {
    pub fn new(
        input_dim: usize,
        kind: ActionKind,
        hidden_layers: &[usize],
        log_std_init: f32,
        device: &B::Device,
    ) -> Self {
        let net = create_mlp(input_dim, kind.output_dim(), hidden_layers, device);
        let log_std = match kind {
            ActionKind::Categorical { .. } => None,
            ActionKind::Gaussian { dim } => Some(Param::from_tensor(Tensor::full(
                [dim],
                log_std_init,
                device,
            ))),
        };

        Self { net, log_std }
    }

    /// Action distribution for a batch of states `[batch, features]`
    pub fn distribution(&self, states: Tensor<B, 2>) -> ActionDistribution<B> {
        let out = self.net.forward(states);
        match &self.log_std {
            None => ActionDistribution::Categorical { logits: out },
            Some(log_std) => {
                let [batch, _] = out.dims();
                let log_std = log_std.val().unsqueeze_dim::<2>(0).repeat_dim(0, batch);
                ActionDistribution::Gaussian { mean: out, log_std }
            }
        }
    }
}

/// Batched action distribution produced by the policy
#[derive(Debug, Clone)]
pub enum ActionDistribution<B: Backend> {
    Categorical {
        logits: Tensor<B, 2>,
    },
    Gaussian {
        mean: Tensor<B, 2>,
        log_std: Tensor<B, 2>,
    },
}

impl<B: Backend> ActionDistribution<B> {
    /// Draw one action per row
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Action>> {
        match self {
            ActionDistribution::Categorical { logits } => {
                let [_, n] = logits.dims();
                let probs = softmax(logits.clone(), 1).into_data();
                let probs: Vec<f32> = probs.iter::<f32>().collect();

                probs
                    .chunks(n)
                    .map(|row| {
                        let dist = WeightedIndex::new(row)
                            .map_err(|e| Error::NonFinite(format!("action probabilities {row:?}: {e}")))?;
                        Ok(Action::Discrete(dist.sample(rng)))
                    })
                    .collect()
            }
            ActionDistribution::Gaussian { mean, log_std } => {
                let [_, dim] = mean.dims();
                let mean: Vec<f32> = mean.clone().into_data().iter::<f32>().collect();
                let std: Vec<f32> = log_std.clone().exp().into_data().iter::<f32>().collect();

                mean.chunks(dim)
                    .zip(std.chunks(dim))
                    .map(|(mu, sigma)| {
                        let a: Vec<f32> = mu
                            .iter()
                            .zip(sigma)
                            .map(|(m, s)| {
                                let n: f32 = StandardNormal.sample(rng);
                                m + s * n
                            })
                            .collect();
                        if a.iter().all(|x| x.is_finite()) {
                            Ok(Action::Continuous(a))
                        } else {
                            Err(Error::NonFinite(format!("gaussian mean {mu:?}, std {sigma:?}")))
                        }
                    })
                    .collect()
            }
        }
    }

    /// Log-probability of `actions`, one value per row
    pub fn log_prob(&self, actions: ActionBatch<B>) -> Result<Tensor<B, 1>> {
        match (self, actions) {
            (ActionDistribution::Categorical { logits }, ActionBatch::Discrete(idx)) => {
                Ok(log_softmax(logits.clone(), 1).gather(1, idx).squeeze::<1>(1))
            }
            (ActionDistribution::Gaussian { mean, log_std }, ActionBatch::Continuous(a)) => {
                let z = (a - mean.clone()) / log_std.clone().exp();
                let half_ln_2pi = 0.5 * (2.0 * PI).ln();
                Ok((z.powf_scalar(2.0).mul_scalar(-0.5) - log_std.clone())
                    .sub_scalar(half_ln_2pi)
                    .sum_dim(1)
                    .squeeze::<1>(1))
            }
            (_, ActionBatch::Discrete(_)) => Err(Error::InvalidAction(
                "discrete actions under a gaussian policy".to_string(),
            )),
            (_, ActionBatch::Continuous(_)) => Err(Error::InvalidAction(
                "continuous actions under a categorical policy".to_string(),
            )),
        }
    }

    /// Entropy of each row's distribution
    pub fn entropy(&self) -> Tensor<B, 1> {
        match self {
            ActionDistribution::Categorical { logits } => {
                let log_p = log_softmax(logits.clone(), 1);
                let p = softmax(logits.clone(), 1);
                (p * log_p).sum_dim(1).squeeze::<1>(1).neg()
            }
            ActionDistribution::Gaussian { log_std, .. } => {
                let half_ln_2pi_e = 0.5 * (1.0 + (2.0 * PI).ln());
                log_std.clone().add_scalar(half_ln_2pi_e).sum_dim(1).squeeze::<1>(1)
            }
        }
    }
}

/// A batch of recorded actions, in the layout [`ActionDistribution::log_prob`] expects
#[derive(Debug, Clone)]
pub enum ActionBatch<B: Backend> {
    /// Indices `[batch, 1]`
    Discrete(Tensor<B, 2, Int>),
    /// Values `[batch, dim]`
    Continuous(Tensor<B, 2>),
}

impl<B: Backend> ActionBatch<B> {
    pub fn from_actions(actions: &[Action], device: &B::Device) -> Result<Self> {
        match actions.first() {
            Some(Action::Discrete(_)) => {
                let indices = actions
                    .iter()
                    .map(|a| match a {
                        Action::Discrete(i) => Ok(*i as i32),
                        other => Err(Error::InvalidAction(format!("mixed action batch: {other:?}"))),
                    })
                    .collect::<Result<Vec<i32>>>()?;

                let indices = Tensor::<B, 1, Int>::from_data(
                    TensorData::from(indices.as_slice()).convert::<B::IntElem>(),
                    device,
                );
                Ok(ActionBatch::Discrete(indices.unsqueeze_dim::<2>(1)))
            }
            Some(Action::Continuous(first)) => {
                let dim = first.len();
                let mut flat = Vec::with_capacity(actions.len() * dim);
                for a in actions {
                    match a {
                        Action::Continuous(v) if v.len() == dim => flat.extend_from_slice(v),
                        other => {
                            return Err(Error::InvalidAction(format!(
                                "expected {dim}-d continuous action, got {other:?}"
                            )))
                        }
                    }
                }

                let data = TensorData::new(flat, [actions.len(), dim]).convert::<B::FloatElem>();
                Ok(ActionBatch::Continuous(Tensor::from_data(data, device)))
            }
            None => Err(Error::InvalidAction("empty action batch".to_string())),
        }
    }
}

/// Everything [`ActorCritic::act`] produces for one state
#[derive(Debug, Clone)]
pub struct ActOutput<B: Backend> {
    pub pi: ActionDistribution<B>,
    pub action: Action,
    pub log_prob: f32,
    pub value: f32,
}

/// Policy and value networks with independent parameters
#[derive(Debug, Clone)]
pub struct ActorCritic<B: Backend> {
    pub actor: Actor<B>,
    pub critic: MLP<B>,
    kind: ActionKind,
    device: B::Device,
}

impl<B: Backend> ActorCritic<B> {
    /// Build both networks for the given spaces
    ///
    /// Fails with [`Error::UnsupportedActionSpace`] unless the action space
    /// is `Discrete` or `Box`.
    pub fn new(
        observation_space: &Space,
        action_space: &Space,
        config: &PPOConfig,
        device: &B::Device,
    ) -> Result<Self> {
        let kind = ActionKind::from_space(action_space)?;
        let input_dim = observation_space.flat_dim();

        let actor = Actor::new(
            input_dim,
            kind,
            &config.hidden_layers,
            config.log_std_init,
            device,
        );
        let critic = create_mlp(input_dim, 1, &config.hidden_layers, device);

        Ok(Self {
            actor,
            critic,
            kind,
            device: device.clone(),
        })
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Sample an action for a single state
    pub fn act<S, R>(&self, state: &S, rng: &mut R) -> Result<ActOutput<B>>
    where
        S: Clone,
        Vec<S>: ToTensor<B, 2, Float>,
        R: Rng + ?Sized,
    {
        let input = states_to_tensor::<B, S>(vec![state.clone()], &self.device);
        let pi = self.actor.distribution(input.clone());

        let action = pi
            .sample(rng)?
            .pop()
            .ok_or_else(|| Error::NonFinite("policy produced no action".to_string()))?;
        let log_prob = pi
            .log_prob(ActionBatch::from_actions(std::slice::from_ref(&action), &self.device)?)?
            .into_scalar()
            .elem::<f32>();
        let value = self.critic.forward(input).into_scalar().elem::<f32>();

        Ok(ActOutput {
            pi,
            action,
            log_prob,
            value,
        })
    }

    /// Value estimate of a single state
    pub fn value<S>(&self, state: &S) -> f32
    where
        S: Clone,
        Vec<S>: ToTensor<B, 2, Float>,
    {
        let input = states_to_tensor::<B, S>(vec![state.clone()], &self.device);
        self.critic.forward(input).into_scalar().elem::<f32>()
    }
}

impl<B: AutodiffBackend> ActorCritic<B> {
    /// Copy of the agent on the inner backend, without gradient tracking
    pub fn valid(&self) -> ActorCritic<B::InnerBackend> {
        ActorCritic {
            actor: self.actor.valid(),
            critic: self.critic.valid(),
            kind: self.kind,
            device: self.device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use rand::{rngs::StdRng, SeedableRng};

    fn obs_space(dim: usize) -> Space {
        Space::Box {
            low: vec![-1.0; dim],
            high: vec![1.0; dim],
        }
    }

    fn scalars(t: Tensor<NdArray, 1>) -> Vec<f32> {
        t.into_data().iter::<f32>().collect()
    }

    #[test]
    fn action_kind_from_space() {
        assert_eq!(
            ActionKind::from_space(&Space::Discrete(3)).unwrap(),
            ActionKind::Categorical { n: 3 }
        );
        assert_eq!(
            ActionKind::from_space(&obs_space(2)).unwrap(),
            ActionKind::Gaussian { dim: 2 }
        );

        let err = ActionKind::from_space(&Space::MultiDiscrete(vec![2, 2])).unwrap_err();
        assert!(matches!(err, Error::UnsupportedActionSpace(_)));
        let err = ActionKind::from_space(&Space::MultiBinary(4)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedActionSpace(_)));
    }

    #[test]
    fn unsupported_action_space_fails_at_construction() {
        let device = NdArrayDevice::default();
        let res = ActorCritic::<NdArray>::new(
            &obs_space(4),
            &Space::MultiBinary(2),
            &PPOConfig::new(),
            &device,
        );
        assert!(matches!(res, Err(Error::UnsupportedActionSpace(_))));
    }

    #[test]
    fn categorical_log_prob_and_entropy() {
        let device = NdArrayDevice::default();
        let logits = Tensor::<NdArray, 2>::from_floats([[0.0, 0.0, 0.0, 0.0], [2.0, 0.0, 0.0, 0.0]], &device);
        let pi = ActionDistribution::Categorical { logits };

        let actions = ActionBatch::from_actions(&[Action::Discrete(1), Action::Discrete(0)], &device).unwrap();
        let lp = scalars(pi.log_prob(actions).unwrap());
        let z = 2.0_f32.exp() + 3.0;
        assert!((lp[0] - 0.25_f32.ln()).abs() < 1e-5);
        assert!((lp[1] - (2.0_f32.exp() / z).ln()).abs() < 1e-5);

        let h = scalars(pi.entropy());
        assert!((h[0] - 4.0_f32.ln()).abs() < 1e-5, "uniform entropy is ln(n)");
        assert!(h[1] < h[0]);
    }

    #[test]
    fn gaussian_log_prob_and_entropy() {
        let device = NdArrayDevice::default();
        let pi = ActionDistribution::Gaussian {
            mean: Tensor::<NdArray, 2>::zeros([1, 2], &device),
            log_std: Tensor::<NdArray, 2>::zeros([1, 2], &device),
        };

        let actions = ActionBatch::from_actions(&[Action::Continuous(vec![0.0, 1.0])], &device).unwrap();
        let lp = scalars(pi.log_prob(actions).unwrap())[0];
        let half_ln_2pi = 0.5 * (2.0 * PI).ln();
        assert!((lp - (-2.0 * half_ln_2pi - 0.5)).abs() < 1e-5, "got {lp}");

        let h = scalars(pi.entropy())[0];
        assert!((h - 2.0 * (0.5 + half_ln_2pi)).abs() < 1e-5);
    }

    #[test]
    fn mixed_action_batch_is_rejected() {
        let device = NdArrayDevice::default();
        let res = ActionBatch::<NdArray>::from_actions(
            &[Action::Discrete(0), Action::Continuous(vec![0.0])],
            &device,
        );
        assert!(matches!(res, Err(Error::InvalidAction(_))));
    }

    #[test]
    fn act_discrete() {
        let device = NdArrayDevice::default();
        let agent = ActorCritic::<NdArray>::new(
            &obs_space(4),
            &Space::Discrete(2),
            &PPOConfig::new().with_hidden_layers(vec![16]),
            &device,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        for _ in 0..10 {
            let out = agent.act(&vec![0.1_f32, -0.2, 0.3, 0.0], &mut rng).unwrap();
            assert!(matches!(out.action, Action::Discrete(a) if a < 2));
            assert!(out.log_prob <= 0.0);
            assert!(out.value.is_finite());
        }
    }

    #[test]
    fn act_gaussian_matches_value() {
        let device = NdArrayDevice::default();
        let agent = ActorCritic::<NdArray>::new(
            &obs_space(3),
            &Space::Box {
                low: vec![-2.0],
                high: vec![2.0],
            },
            &PPOConfig::new(),
            &device,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let state = [0.5_f32, 0.5, 0.0];

        let out = agent.act(&state, &mut rng).unwrap();
        match &out.action {
            Action::Continuous(a) => assert_eq!(a.len(), 1),
            other => panic!("expected continuous action, got {other:?}"),
        }
        assert!((out.value - agent.value(&state)).abs() < 1e-6);
        assert_eq!(agent.kind(), ActionKind::Gaussian { dim: 1 });
    }
}
