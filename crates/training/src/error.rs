use grasp_dataset::DatasetError;
use grasp_metrics::MetricsError;
use std::path::PathBuf;
use thiserror::Error;

pub type TrainingResult<T> = Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("checkpoint error at {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },
    #[error("training cancelled")]
    Cancelled,
    /// Tensor data could not be brought back to the host, or similar backend failures.
    #[error("backend error: {0}")]
    Backend(String),
}
