//! Dataset side of grasp training: annotation CSV loading, k-fold splitting,
//! image/grasp augmentation and Burn-compatible batch sources.
//!
//! The training crate only sees [`BatchSource`] and [`FoldDatasetFactory`];
//! everything else here is the concrete Cornell-style implementation behind them.

pub mod annotations;
pub mod aug;
pub mod batch;
pub mod factory;
pub mod folds;
pub mod types;

pub use annotations::load_annotations;
pub use aug::{
    CoTransform, ColorJitter, Normalize, TargetEncoding, TransformSet, TransformSetBuilder,
};
pub use batch::{BatchSource, GraspBatch, GraspLoader, LoaderConfig};
pub use factory::{FoldDatasetFactory, FoldLoaderSettings, FoldSources, GraspFoldFactory};
pub use folds::FoldPlan;
pub use types::*;
