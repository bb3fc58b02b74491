use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f32::consts::PI;

use crate::env::{Action, Environment, Report, Space, Step};
use crate::error::{Error, Result};

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const G: f32 = 10.0;
const M: f32 = 1.0;
const L: f32 = 1.0;

/// State representation: [cos(θ), sin(θ), θ_dot]
pub type PendulumState = [f32; 3];

/// Classic Pendulum environment with continuous action space
///
/// The goal is to keep the pendulum upright by applying torque.
/// The state is represented as [cos(θ), sin(θ), angular_velocity] to avoid
/// discontinuity issues with angle wrapping.
///
/// The pendulum never terminates on its own; episodes are bounded by the
/// trainer's `max_episode_len` (200 matches the usual `Pendulum-v1` limit).
///
/// # Physics
/// - Mass: 1.0 kg
/// - Length: 1.0 m
/// - Gravity: 10.0 m/s²
/// - Time step: 0.05 s
/// - Max angular velocity: 8.0 rad/s
/// - Max torque: 2.0 N⋅m
///
/// # Reward
/// r = -θ² - 0.1⋅θ̇² - 0.001⋅u²
#[derive(Debug, Clone)]
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    rng: StdRng,
}

impl Pendulum {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Pendulum whose initial states are reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            theta: 0.0,
            theta_dot: 0.0,
            rng,
        }
    }

    fn get_state(&self) -> PendulumState {
        [self.theta.cos(), self.theta.sin(), self.theta_dot]
    }

    fn angle_normalize(x: f32) -> f32 {
        (x + PI).rem_euclid(2.0 * PI) - PI
    }
}

impl Default for Pendulum {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for Pendulum {
    type State = PendulumState;

    fn observation_space(&self) -> Space {
        Space::Box {
            low: vec![-1.0, -1.0, -MAX_SPEED],
            high: vec![1.0, 1.0, MAX_SPEED],
        }
    }

    fn action_space(&self) -> Space {
        Space::Box {
            low: vec![-MAX_TORQUE],
            high: vec![MAX_TORQUE],
        }
    }

    fn reset(&mut self) -> Result<Self::State> {
        self.theta = self.rng.gen_range(-PI..PI);
        self.theta_dot = self.rng.gen_range(-1.0..1.0);
        Ok(self.get_state())
    }

    fn step(&mut self, action: &Action) -> Result<Step<Self::State>> {
        let torque = match action {
            Action::Continuous(u) if u.len() == 1 => u[0].clamp(-MAX_TORQUE, MAX_TORQUE),
            other => {
                return Err(Error::InvalidAction(format!(
                    "Pendulum expects a 1-d continuous torque, got {other:?}"
                )))
            }
        };

        // Reward is computed on the pre-step angle
        let reward = -(Self::angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * torque.powi(2));

        // Physics: θ̈ = (3g/2L)sin(θ) + (3/mL²)u
        let theta_acc = (3.0 * G / (2.0 * L)) * self.theta.sin() + (3.0 / (M * L * L)) * torque;

        self.theta_dot = (self.theta_dot + theta_acc * DT).clamp(-MAX_SPEED, MAX_SPEED);
        self.theta = Self::angle_normalize(self.theta + self.theta_dot * DT);

        let mut info = Report::new(vec!["torque"]);
        info.entry("torque").and_modify(|x| *x = torque as f64);

        Ok(Step {
            next_state: self.get_state(),
            reward,
            done: false,
            info,
        })
    }
}
