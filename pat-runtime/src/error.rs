use pat::ExperimentError;
use std::sync::PoisonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No experiment found with guid {0}")]
    NotFound(String),

    #[error("IO error in sample store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error writing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Store mutex is poisoned.")]
    PoisonData,
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_err: PoisonError<T>) -> Self {
        Self::PoisonData
    }
}

#[derive(Debug, Error)]
pub enum LabError {
    #[error("Experiment error: {0}")]
    Experiment(#[from] ExperimentError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Experiment registry mutex is poisoned.")]
    PoisonData,
}

impl<T> From<PoisonError<T>> for LabError {
    fn from(_err: PoisonError<T>) -> Self {
        Self::PoisonData
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Server error: {0}")]
    Server(#[from] crate::server::ServerError),

    #[error("Laboratory error: {0}")]
    Lab(#[from] LabError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Experiment error: {0}")]
    Experiment(#[from] ExperimentError),
}
