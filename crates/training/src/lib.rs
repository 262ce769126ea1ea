//! Cross-validated training of grasp regressors on Burn.
//!
//! [`CrossValidation`] walks the folds, [`EpochRunner`] runs the per-epoch
//! loops, and [`run::run_train`] / [`run::run_eval`] wire both to the
//! dataset, GraspNet and SGD for the `train` and `eval` binaries.
#![recursion_limit = "256"]

pub mod config;
pub mod context;
pub mod cross_validation;
pub mod epoch;
pub mod error;
pub mod loss;
pub mod optim;
pub mod progress;
pub mod run;
pub mod session;

pub use config::{EvalArgs, TrainArgs, TrainConfig};
pub use context::{CancelToken, ExecutionContext};
pub use cross_validation::{CrossValidation, CrossValidationReport, FoldReport, FoldTrainer};
pub use epoch::{evaluate_tensors, EpochRunner, EpochStats};
pub use error::{TrainingError, TrainingResult};
pub use loss::{GraspLoss, MseGraspLoss};
pub use optim::{sgd, OptimizerStep, ParameterStep, SgdSettings, SgdStep};
pub use progress::{
    BatchProgress, EpochSummary, NullProgress, Phase, ProgressSink, TracingProgress,
};
pub use run::{run_eval, run_train};
pub use session::{load_checkpoint, save_checkpoint, GraspNetTrainer, ModelInit};

/// Inference backend for training and evaluation.
pub type TrainBackend = burn::backend::NdArray<f32>;
/// Autodiff wrapper used while training.
pub type AutodiffTrainBackend = burn::backend::Autodiff<TrainBackend>;
