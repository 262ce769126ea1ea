//! Grasp correctness scoring and running statistics.
//!
//! - [`RunningStatistic`]: online count/sum/average accumulator, one per epoch phase.
//! - [`GeometricMatchEvaluator`]: scores predicted grasp boxes against targets
//!   (orientation within 30 degrees and IoU above 0.25) and reports the batch
//!   fraction of matches.
//! - [`IntersectionArea`]: the overlap primitive the evaluator is parameterised on.

pub mod error;
pub mod evaluator;
pub mod intersection;
pub mod stats;

pub use error::{MetricsError, MetricsResult};
pub use evaluator::{AngleRule, GeometricMatchEvaluator, MatchCriteria, SampleMatch};
pub use intersection::{AxisAligned, IntersectionArea, IntersectionKind, Rotated};
pub use stats::RunningStatistic;
