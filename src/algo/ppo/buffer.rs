//! Per-epoch experience buffer
//!
//! Holds the annotated transitions of one epoch and hands them out in
//! recording order, in chunks of `batch_size`. Draining empties the buffer,
//! so nothing leaks into the next epoch.

use super::rollout::AnnotatedTransition;
use crate::{env::Action, error::Result};

/// Column layout of a chunk of transitions, ready for tensor conversion
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<S> {
    pub states: Vec<S>,
    pub actions: Vec<Action>,
    pub log_probs: Vec<f32>,
    pub qvals: Vec<f32>,
    pub advs: Vec<f32>,
}

impl<S> Batch<S> {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl<S> FromIterator<AnnotatedTransition<S>> for Batch<S> {
    fn from_iter<I: IntoIterator<Item = AnnotatedTransition<S>>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let (n, _) = iter.size_hint();
        let mut batch = Batch {
            states: Vec::with_capacity(n),
            actions: Vec::with_capacity(n),
            log_probs: Vec::with_capacity(n),
            qvals: Vec::with_capacity(n),
            advs: Vec::with_capacity(n),
        };

        for t in iter {
            batch.states.push(t.state);
            batch.actions.push(t.action);
            batch.log_probs.push(t.log_prob);
            batch.qvals.push(t.qval);
            batch.advs.push(t.adv);
        }
        batch
    }
}

/// Transitions of the current epoch
#[derive(Debug, Clone)]
pub struct ExperienceBuffer<S> {
    transitions: Vec<AnnotatedTransition<S>>,
}

impl<S> Default for ExperienceBuffer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ExperienceBuffer<S> {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Replace the content with an epoch rollout
    ///
    /// Stops at the first error; the buffer is then left empty.
    pub fn fill<I>(&mut self, rollout: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<AnnotatedTransition<S>>>,
    {
        self.transitions.clear();
        let transitions = rollout.into_iter().collect::<Result<Vec<_>>>()?;
        self.transitions = transitions;
        Ok(self.transitions.len())
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AnnotatedTransition<S>> {
        self.transitions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotatedTransition<S>> {
        self.transitions.iter()
    }

    /// Take every transition, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<AnnotatedTransition<S>> {
        std::mem::take(&mut self.transitions)
    }

    /// Take every transition as consecutive batches of `batch_size`
    ///
    /// The last batch is shorter when the epoch length is not a multiple of
    /// `batch_size`.
    pub fn drain_batches(&mut self, batch_size: usize) -> Vec<Batch<S>> {
        let batch_size = batch_size.max(1);
        let mut batches = Vec::with_capacity(self.len().div_ceil(batch_size));

        let mut rest = self.drain().into_iter().peekable();
        while rest.peek().is_some() {
            batches.push(rest.by_ref().take(batch_size).collect());
        }
        batches
    }
}
