//! Hyper-parameters of the PPO trainer

use burn::config::Config;

use crate::error::Error;

/// Configuration for the [`PPO`](super::PPO) trainer
///
/// ```ignore
/// let config = PPOConfig::new()
///     .with_steps_per_epoch(4096)
///     .with_clip_ratio(0.1);
/// config.save("ppo.json")?;
/// ```
#[derive(Config, Debug)]
pub struct PPOConfig {
    /// Discount factor γ
    #[config(default = 0.99)]
    pub gamma: f32,
    /// GAE discount λ
    #[config(default = 0.95)]
    pub lam: f32,
    /// Learning rate of the policy network
    #[config(default = 3e-4)]
    pub lr_actor: f64,
    /// Learning rate of the value network
    #[config(default = 1e-3)]
    pub lr_critic: f64,
    /// Maximum number of steps in one episode segment before truncation
    #[config(default = 1000)]
    pub max_episode_len: usize,
    /// Number of transitions per optimisation batch
    ///
    /// Must be greater than 1: advantages are normalised per batch.
    #[config(default = 512)]
    pub batch_size: usize,
    /// Environment steps collected per epoch
    #[config(default = 2048)]
    pub steps_per_epoch: usize,
    /// Gradient steps performed on each batch, for both networks
    #[config(default = 4)]
    pub nb_optim_iters: usize,
    /// Clipping parameter ε of the surrogate objective
    #[config(default = 0.2)]
    pub clip_ratio: f32,
    /// Hidden layer sizes of both networks
    #[config(default = "vec![64, 64]")]
    pub hidden_layers: Vec<usize>,
    /// Initial log standard deviation of Gaussian policies
    #[config(default = "-0.5")]
    pub log_std_init: f32,
    /// Seed for parameter initialisation and action sampling
    pub seed: Option<u64>,
}

impl Default for PPOConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PPOConfig {
    /// Reject hyper-parameters PPO cannot run with
    pub fn validate(&self) -> crate::error::Result<()> {
        fn unit(field: &'static str, value: f32) -> crate::error::Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(Error::InvalidConfig {
                    field,
                    reason: format!("must be in [0, 1], got {value}"),
                })
            }
        }
        fn positive_lr(field: &'static str, value: f64) -> crate::error::Result<()> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(Error::InvalidConfig {
                    field,
                    reason: format!("must be > 0, got {value}"),
                })
            }
        }
        fn nonzero(field: &'static str, value: usize) -> crate::error::Result<()> {
            if value > 0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig {
                    field,
                    reason: "must be > 0".to_string(),
                })
            }
        }

        unit("gamma", self.gamma)?;
        unit("lam", self.lam)?;
        positive_lr("lr_actor", self.lr_actor)?;
        positive_lr("lr_critic", self.lr_critic)?;
        nonzero("max_episode_len", self.max_episode_len)?;
        nonzero("batch_size", self.batch_size)?;
        nonzero("steps_per_epoch", self.steps_per_epoch)?;
        nonzero("nb_optim_iters", self.nb_optim_iters)?;

        if !(self.clip_ratio > 0.0 && self.clip_ratio < 1.0) {
            return Err(Error::InvalidConfig {
                field: "clip_ratio",
                reason: format!("must be in (0, 1), got {}", self.clip_ratio),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PPOConfig::default();
        assert_eq!(config.gamma, 0.99);
        assert_eq!(config.lam, 0.95);
        assert_eq!(config.lr_actor, 3e-4);
        assert_eq!(config.lr_critic, 1e-3);
        assert_eq!(config.max_episode_len, 1000);
        assert_eq!(config.batch_size, 512);
        assert_eq!(config.steps_per_epoch, 2048);
        assert_eq!(config.nb_optim_iters, 4);
        assert_eq!(config.clip_ratio, 0.2);
        assert_eq!(config.hidden_layers, vec![64, 64]);
        assert_eq!(config.log_std_init, -0.5);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = PPOConfig::new().with_gamma(1.5).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { field: "gamma", .. }));

        let err = PPOConfig::new().with_clip_ratio(0.0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { field: "clip_ratio", .. }));

        let err = PPOConfig::new().with_nb_optim_iters(0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { field: "nb_optim_iters", .. }));

        let err = PPOConfig::new().with_lr_critic(-1.0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { field: "lr_critic", .. }));
    }

    #[test]
    fn save_and_load_keep_overrides() {
        let path = std::env::temp_dir().join(format!("ppo-config-{}.json", std::process::id()));
        let config = PPOConfig::new().with_batch_size(64).with_seed(Some(3));
        config.save(&path).unwrap();

        let loaded = PPOConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.batch_size, 64);
        assert_eq!(loaded.seed, Some(3));
        assert_eq!(loaded.gamma, config.gamma);
    }
}
