use thiserror::Error;

/// Invalid configuration, detected before any task of a run is started.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("Iterations must be at least 1")]
    ZeroIterations,

    #[error("No workload registered under \"{0}\"")]
    UnknownWorkload(String),
}

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Sampler task failed. This is a bug in pat.")]
    SamplerPanicked,

    #[error("Tracker task panicked.")]
    TrackerPanicked,
}
