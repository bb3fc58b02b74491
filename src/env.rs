//! Environment adapter consumed by the PPO trainer
//!
//! An [`Environment`] exposes gym-style `reset`/`step` plus two [`Space`]
//! descriptors that are queried once, when a trainer is built.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use crate::error::Result;

/// Shape and type of an observation or action space
#[derive(Debug, Clone, PartialEq)]
pub enum Space {
    /// `n` categorical choices, `0..n`
    Discrete(usize),
    /// Bounded real vector, `low[i] <= x[i] <= high[i]`
    Box { low: Vec<f32>, high: Vec<f32> },
    /// Several independent categorical choices
    MultiDiscrete(Vec<usize>),
    /// Vector of independent binary choices
    MultiBinary(usize),
}

impl Space {
    /// Number of scalars needed to describe one element of the space
    pub fn flat_dim(&self) -> usize {
        match self {
            Space::Discrete(_) => 1,
            Space::Box { low, .. } => low.len(),
            Space::MultiDiscrete(nvec) => nvec.len(),
            Space::MultiBinary(n) => *n,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Space::Discrete(_) => "Discrete",
            Space::Box { .. } => "Box",
            Space::MultiDiscrete(_) => "MultiDiscrete",
            Space::MultiBinary(_) => "MultiBinary",
        }
    }
}

/// An action sampled by the agent
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Discrete(usize),
    Continuous(Vec<f32>),
}

/// Free-form per-step diagnostics, keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report(HashMap<&'static str, f64>);

impl Report {
    /// Create a report with every key initialised to zero
    pub fn new(keys: Vec<&'static str>) -> Self {
        Self(keys.into_iter().map(|k| (k, 0.0)).collect())
    }
}

impl Deref for Report {
    type Target = HashMap<&'static str, f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Report {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step<S> {
    pub next_state: S,
    pub reward: f32,
    /// The episode ended naturally (not by a step limit)
    pub done: bool,
    pub info: Report,
}

/// A sequential-interaction environment
pub trait Environment {
    type State: Clone;

    fn observation_space(&self) -> Space;

    fn action_space(&self) -> Space;

    /// Start a new episode and return its first state
    fn reset(&mut self) -> Result<Self::State>;

    /// Apply `action` and advance the simulation by one step
    fn step(&mut self, action: &Action) -> Result<Step<Self::State>>;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    type State = E::State;

    fn observation_space(&self) -> Space {
        (**self).observation_space()
    }

    fn action_space(&self) -> Space {
        (**self).action_space()
    }

    fn reset(&mut self) -> Result<Self::State> {
        (**self).reset()
    }

    fn step(&mut self, action: &Action) -> Result<Step<Self::State>> {
        (**self).step(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_dim_per_space() {
        assert_eq!(Space::Discrete(4).flat_dim(), 1);
        let b = Space::Box {
            low: vec![-1.0; 3],
            high: vec![1.0; 3],
        };
        assert_eq!(b.flat_dim(), 3);
        assert_eq!(Space::MultiDiscrete(vec![2, 3]).flat_dim(), 2);
        assert_eq!(Space::MultiBinary(5).flat_dim(), 5);
    }

    #[test]
    fn report_starts_at_zero() {
        let mut report = Report::new(vec!["reward", "steps"]);
        assert_eq!(report.get("reward"), Some(&0.0));
        report.entry("reward").and_modify(|x| *x += 1.5);
        assert_eq!(report["reward"], 1.5);
    }
}
