use gym_rs::core::{ActionReward, Env};
use gym_rs::envs::classical_control::mountain_car::{MountainCarEnv, MountainCarObservation};
use gym_rs::utils::renderer::RenderMode;
use strum::{FromRepr, VariantArray};

use crate::env::{Action, Environment, Report, Space, Step};
use crate::error::{Error, Result};

fn obs2arr(observation: MountainCarObservation) -> Result<[f32; 2]> {
    let v: Vec<f32> = Vec::from(observation).into_iter().map(|x| x as f32).collect();
    <[f32; 2]>::try_from(v)
        .map_err(|v| Error::Environment(format!("MountainCar observation has {} values, expected 2", v.len())))
}

/// Actions for the [`MountainCar`] environment
/// 0 = push left, 1 = no push, 2 = push right
#[derive(FromRepr, VariantArray, Clone, Copy, Debug)]
pub enum MCAction {
    PushLeft = 0,
    NoPush = 1,
    PushRight = 2,
}

/// The classic Mountain Car reinforcement learning environment with discrete actions
///
/// This implementation is a thin wrapper around [gym_rs](https://github.com/MathisWellmann/gym-rs)
#[derive(Debug, Clone)]
pub struct MountainCar {
    gym_env: MountainCarEnv,
}

impl MountainCar {
    pub fn new(render_mode: RenderMode) -> Self {
        Self {
            gym_env: MountainCarEnv::new(render_mode),
        }
    }
}

impl Environment for MountainCar {
    type State = [f32; 2]; // [position, velocity]

    fn observation_space(&self) -> Space {
        Space::Box {
            low: vec![-1.2, -0.07],
            high: vec![0.6, 0.07],
        }
    }

    fn action_space(&self) -> Space {
        Space::Discrete(MCAction::VARIANTS.len())
    }

    fn step(&mut self, action: &Action) -> Result<Step<Self::State>> {
        let action = match action {
            Action::Discrete(idx) => MCAction::from_repr(*idx),
            Action::Continuous(_) => None,
        }
        .ok_or_else(|| Error::InvalidAction(format!("MountainCar expects Discrete(0..3), got {action:?}")))?;

        let ActionReward {
            observation,
            reward,
            done,
            ..
        } = self.gym_env.step(action as usize);

        let mut info = Report::new(vec!["reward"]);
        info.entry("reward").and_modify(|x| *x += *reward);

        Ok(Step {
            next_state: obs2arr(observation)?,
            reward: *reward as f32,
            done,
            info,
        })
    }

    fn reset(&mut self) -> Result<Self::State> {
        obs2arr(self.gym_env.reset(None, false, None).0)
    }
}
