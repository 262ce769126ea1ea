use thiserror::Error;

pub type MetricsResult<T> = Result<T, MetricsError>;

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    /// Empty batch, or prediction/target counts differ.
    #[error("invalid batch size: {predicted} predictions vs {target} targets")]
    InvalidBatchSize { predicted: usize, target: usize },
    /// Union area is zero, negative or not finite, so IoU is undefined.
    #[error("degenerate geometry at sample {index}: union area {union}")]
    DegenerateGeometry { index: usize, union: f32 },
    /// Flat prediction/target buffers that are not `[n, 5]`.
    #[error("invalid shape: expected [n, 5], got {0:?}")]
    InvalidShape(Vec<usize>),
}
