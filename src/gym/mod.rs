//! Built-in environments
//!
//! [`CartPole`] and [`Pendulum`] are native. [`MountainCar`] wraps
//! [gym_rs](https://github.com/MathisWellmann/gym-rs) and needs the `gym`
//! feature.

mod cartpole;
#[cfg(feature = "gym")]
mod mountain_car;
mod pendulum;

pub use cartpole::{CartPole, CartPoleAction, CartPoleState};
#[cfg(feature = "gym")]
pub use mountain_car::{MCAction, MountainCar};
pub use pendulum::{Pendulum, PendulumState};

use crate::env::{Action, Environment, Space, Step};
use crate::error::{Error, Result};

/// Any built-in environment, with states flattened to `Vec<f32>`
///
/// Returned by [`make`] so callers can select an environment by id.
#[derive(Debug, Clone)]
pub enum GymEnv {
    CartPole(CartPole),
    Pendulum(Pendulum),
    #[cfg(feature = "gym")]
    MountainCar(MountainCar),
}

/// Build a built-in environment from its id
///
/// Known ids: `CartPole-v1`, `Pendulum-v1`, `MountainCar-v0` (with the `gym`
/// feature).
pub fn make(id: &str) -> Result<GymEnv> {
    match id {
        "CartPole-v0" | "CartPole-v1" => Ok(GymEnv::CartPole(CartPole::new())),
        "Pendulum-v1" => Ok(GymEnv::Pendulum(Pendulum::new())),
        #[cfg(feature = "gym")]
        "MountainCar-v0" => Ok(GymEnv::MountainCar(MountainCar::new(
            gym_rs::utils::renderer::RenderMode::None,
        ))),
        #[cfg(not(feature = "gym"))]
        "MountainCar-v0" => Err(Error::MissingEnvironment {
            id: id.to_string(),
            reason: "requires the `gym` feature (gym-rs)".to_string(),
        }),
        _ => Err(Error::MissingEnvironment {
            id: id.to_string(),
            reason: "unknown environment id".to_string(),
        }),
    }
}

fn flatten<const N: usize>(step: Step<[f32; N]>) -> Step<Vec<f32>> {
    Step {
        next_state: step.next_state.to_vec(),
        reward: step.reward,
        done: step.done,
        info: step.info,
    }
}

impl Environment for GymEnv {
    type State = Vec<f32>;

    fn observation_space(&self) -> Space {
        match self {
            GymEnv::CartPole(env) => env.observation_space(),
            GymEnv::Pendulum(env) => env.observation_space(),
            #[cfg(feature = "gym")]
            GymEnv::MountainCar(env) => env.observation_space(),
        }
    }

    fn action_space(&self) -> Space {
        match self {
            GymEnv::CartPole(env) => env.action_space(),
            GymEnv::Pendulum(env) => env.action_space(),
            #[cfg(feature = "gym")]
            GymEnv::MountainCar(env) => env.action_space(),
        }
    }

    fn reset(&mut self) -> Result<Self::State> {
        Ok(match self {
            GymEnv::CartPole(env) => env.reset()?.to_vec(),
            GymEnv::Pendulum(env) => env.reset()?.to_vec(),
            #[cfg(feature = "gym")]
            GymEnv::MountainCar(env) => env.reset()?.to_vec(),
        })
    }

    fn step(&mut self, action: &Action) -> Result<Step<Self::State>> {
        Ok(match self {
            GymEnv::CartPole(env) => flatten(env.step(action)?),
            GymEnv::Pendulum(env) => flatten(env.step(action)?),
            #[cfg(feature = "gym")]
            GymEnv::MountainCar(env) => flatten(env.step(action)?),
        })
    }
}
