pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The workload's setup phase failed. Fatal: the run aborts before
    /// any iteration executes and nothing is recorded.
    #[error("setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Metric(#[from] rampr_metrics::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("`stages` must be a non-empty list of {{ duration, target }}")]
    EmptyStages,

    #[error("total stage duration must be greater than zero")]
    ZeroDuration,

    #[error("at least one stage (or the start target) must have target > 0")]
    ZeroPeakTarget,

    #[error("`tick` must be a positive duration")]
    InvalidTick,

    #[error("invalid threshold for metric `{metric}`: {error}")]
    InvalidThreshold { metric: String, error: String },
}
