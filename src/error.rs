//! Error type shared by environments, configuration and the trainer

/// Errors raised while building or running a PPO trainer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The environment's action space is neither `Discrete` nor `Box`
    #[error("unsupported action space: {0} (expected Box or Discrete)")]
    UnsupportedActionSpace(String),

    /// The requested environment is unknown or needs a disabled feature
    #[error("environment `{id}` is not available: {reason}")]
    MissingEnvironment { id: String, reason: String },

    /// A hyper-parameter is outside its valid range
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// An environment received an action of the wrong kind or arity
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// The policy produced probabilities or parameters that cannot be sampled
    #[error("non-finite policy output: {0}")]
    NonFinite(String),

    /// Any other failure reported by an environment
    #[error("environment error: {0}")]
    Environment(String),
}

pub type Result<T> = std::result::Result<T, Error>;
