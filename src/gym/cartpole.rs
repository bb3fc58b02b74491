use rand::{rngs::StdRng, Rng, SeedableRng};
use strum::{FromRepr, VariantArray};

use crate::env::{Action, Environment, Report, Space, Step};
use crate::error::{Error, Result};

const GRAVITY: f32 = 9.8;
const CART_MASS: f32 = 1.0;
const POLE_MASS: f32 = 0.1;
const POLE_HALF_LENGTH: f32 = 0.5;
const FORCE_MAG: f32 = 10.0;
const DT: f32 = 0.02;
const X_THRESHOLD: f32 = 2.4;
const THETA_THRESHOLD: f32 = 12.0 * std::f32::consts::PI / 180.0;
const INIT_RANGE: f32 = 0.05;

/// State representation: [x, x_dot, θ, θ_dot]
pub type CartPoleState = [f32; 4];

/// Actions for the [`CartPole`] environment
#[derive(FromRepr, VariantArray, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CartPoleAction {
    PushLeft = 0,
    PushRight = 1,
}

/// The classic cart-pole balancing task
///
/// Reward is `1.0` for every step, including the one that drops the pole.
/// The episode terminates once the pole leans more than 12° or the cart
/// leaves `[-2.4, 2.4]`. There is no internal step limit.
#[derive(Debug, Clone)]
pub struct CartPole {
    state: CartPoleState,
    rng: StdRng,
}

impl CartPole {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Cart-pole whose initial states are reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: [0.0; 4],
            rng,
        }
    }

    fn is_terminal(&self) -> bool {
        let [x, _, theta, _] = self.state;
        x.abs() > X_THRESHOLD || theta.abs() > THETA_THRESHOLD
    }
}

impl Default for CartPole {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for CartPole {
    type State = CartPoleState;

    fn observation_space(&self) -> Space {
        let high = vec![X_THRESHOLD * 2.0, f32::MAX, THETA_THRESHOLD * 2.0, f32::MAX];
        Space::Box {
            low: high.iter().map(|h| -h).collect(),
            high,
        }
    }

    fn action_space(&self) -> Space {
        Space::Discrete(CartPoleAction::VARIANTS.len())
    }

    fn reset(&mut self) -> Result<Self::State> {
        for v in self.state.iter_mut() {
            *v = self.rng.gen_range(-INIT_RANGE..INIT_RANGE);
        }
        Ok(self.state)
    }

    fn step(&mut self, action: &Action) -> Result<Step<Self::State>> {
        let action = match action {
            Action::Discrete(idx) => CartPoleAction::from_repr(*idx),
            Action::Continuous(_) => None,
        }
        .ok_or_else(|| Error::InvalidAction(format!("CartPole expects Discrete(0|1), got {action:?}")))?;

        let force = match action {
            CartPoleAction::PushLeft => -FORCE_MAG,
            CartPoleAction::PushRight => FORCE_MAG,
        };

        let [x, x_dot, theta, theta_dot] = self.state;
        let (sin_theta, cos_theta) = theta.sin_cos();

        let total_mass = CART_MASS + POLE_MASS;
        let pole_mass_length = POLE_MASS * POLE_HALF_LENGTH;

        let temp = (force + pole_mass_length * theta_dot * theta_dot * sin_theta) / total_mass;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (POLE_HALF_LENGTH * (4.0 / 3.0 - POLE_MASS * cos_theta * cos_theta / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        // Explicit Euler
        self.state = [
            x + DT * x_dot,
            x_dot + DT * x_acc,
            theta + DT * theta_dot,
            theta_dot + DT * theta_acc,
        ];

        Ok(Step {
            next_state: self.state,
            reward: 1.0,
            done: self.is_terminal(),
            info: Report::default(),
        })
    }
}
