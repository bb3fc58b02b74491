//! Discounted returns and Generalized Advantage Estimation
//!
//! Both estimators run on a single episode segment of arbitrary length and
//! are computed with one backward pass.

/// Reverse cumulative sum: `acc[t] = x[t] + discount * acc[t + 1]`
///
/// The accumulator past the last element is 0. Output order matches input
/// order.
pub fn discounted_returns(rewards: &[f32], discount: f32) -> Vec<f32> {
    let mut out = vec![0.0; rewards.len()];
    let mut acc = 0.0;
    for (o, &r) in out.iter_mut().zip(rewards).rev() {
        acc = r + discount * acc;
        *o = acc;
    }
    out
}

/// Return and advantage estimator for closed episode segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvantageEstimator {
    pub gamma: f32,
    pub lam: f32,
}

impl AdvantageEstimator {
    pub fn new(gamma: f32, lam: f32) -> Self {
        Self { gamma, lam }
    }

    /// Discounted return-to-go of every step, bootstrapped past the end
    pub fn returns(&self, rewards: &[f32], bootstrap: f32) -> Vec<f32> {
        let mut extended = Vec::with_capacity(rewards.len() + 1);
        extended.extend_from_slice(rewards);
        extended.push(bootstrap);

        let mut qvals = discounted_returns(&extended, self.gamma);
        qvals.pop();
        qvals
    }

    /// GAE-λ advantages of a segment
    ///
    /// `bootstrap` stands in for the value of the state following the last
    /// step: 0 after a natural termination, the critic's estimate otherwise.
    pub fn gae(&self, rewards: &[f32], values: &[f32], bootstrap: f32) -> Vec<f32> {
        debug_assert_eq!(rewards.len(), values.len());

        let next_values = values.iter().skip(1).chain(std::iter::once(&bootstrap));
        let deltas: Vec<f32> = rewards
            .iter()
            .zip(values)
            .zip(next_values)
            .map(|((&r, &v), &next_v)| r + self.gamma * next_v - v)
            .collect();

        discounted_returns(&deltas, self.gamma * self.lam)
    }
}

/// Normalise advantages in place to zero mean and unit standard deviation
///
/// Uses the unbiased standard deviation plus `1e-8`. A batch of fewer than
/// two elements has no spread; its advantages are zeroed and a warning is
/// emitted.
pub fn normalize_advantages(advs: &mut [f32]) {
    let n = advs.len();
    if n < 2 {
        tracing::warn!(batch_len = n, "batch too small to normalise advantages");
        advs.iter_mut().for_each(|a| *a = 0.0);
        return;
    }

    let mean = advs.iter().sum::<f32>() / n as f32;
    let var = advs.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / (n - 1) as f32;
    let std = var.sqrt() + 1e-8;

    for a in advs.iter_mut() {
        *a = (*a - mean) / std;
    }
}
