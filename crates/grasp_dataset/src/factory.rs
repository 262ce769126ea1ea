//! Per-fold construction of train and validation sources.

use std::path::Path;
use std::sync::Arc;

use crate::annotations::load_annotations;
use crate::aug::TransformSet;
use crate::batch::{BatchSource, GraspLoader, LoaderConfig};
use crate::folds::FoldPlan;
use crate::types::{DatasetResult, GraspRecord, Split, SplitType};

/// Train and validation sources of one fold.
pub struct FoldSources<S> {
    pub train: S,
    pub val: S,
}

pub trait FoldDatasetFactory {
    type Source: BatchSource;

    /// Build the sources for `fold`; the training source shuffles, validation
    /// keeps annotation order.
    fn build(&mut self, fold: usize) -> DatasetResult<FoldSources<Self::Source>>;
}

/// Loader settings shared by every fold.
#[derive(Debug, Clone)]
pub struct FoldLoaderSettings {
    pub batch_size: usize,
    pub workers: usize,
    pub seed: Option<u64>,
    pub train_transforms: TransformSet,
    pub val_transforms: TransformSet,
}

impl Default for FoldLoaderSettings {
    fn default() -> Self {
        Self {
            batch_size: 64,
            workers: 4,
            seed: None,
            train_transforms: TransformSet::train_default(),
            val_transforms: TransformSet::val_default(),
        }
    }
}

pub struct GraspFoldFactory {
    records: Vec<GraspRecord>,
    plan: FoldPlan,
    settings: FoldLoaderSettings,
    pool: Arc<rayon::ThreadPool>,
}

impl GraspFoldFactory {
    pub fn new(
        records: Vec<GraspRecord>,
        plan: FoldPlan,
        settings: FoldLoaderSettings,
    ) -> DatasetResult<Self> {
        let pool = LoaderConfig {
            workers: settings.workers,
            ..LoaderConfig::default()
        }
        .build_pool()?;
        Ok(Self {
            records,
            plan,
            settings,
            pool,
        })
    }

    /// Load `csv_path`, assign folds, and build a factory over the result.
    pub fn from_csv(
        csv_path: &Path,
        data_dir: &Path,
        num_folds: usize,
        split_type: SplitType,
        split_seed: u64,
        settings: FoldLoaderSettings,
    ) -> DatasetResult<Self> {
        let records = load_annotations(csv_path, data_dir)?;
        let plan = FoldPlan::new(&records, num_folds, split_type, split_seed)?;
        Self::new(records, plan, settings)
    }

    pub fn num_folds(&self) -> usize {
        self.plan.num_folds()
    }

    pub fn records(&self) -> &[GraspRecord] {
        &self.records
    }

    fn loader(&self, records: Vec<GraspRecord>, split: Split) -> DatasetResult<GraspLoader> {
        let (transforms, shuffle) = match split {
            Split::Train => (self.settings.train_transforms.clone(), true),
            Split::Val => (self.settings.val_transforms.clone(), false),
        };
        let cfg = LoaderConfig {
            batch_size: self.settings.batch_size,
            shuffle,
            seed: self.settings.seed,
            drop_last: false,
            workers: self.settings.workers,
        };
        GraspLoader::new(records, transforms, cfg, Arc::clone(&self.pool))
    }
}

impl FoldDatasetFactory for GraspFoldFactory {
    type Source = GraspLoader;

    fn build(&mut self, fold: usize) -> DatasetResult<FoldSources<GraspLoader>> {
        let train = self.plan.split(&self.records, fold, Split::Train)?;
        let val = self.plan.split(&self.records, fold, Split::Val)?;
        tracing::info!(
            fold,
            train_grasps = train.len(),
            val_grasps = val.len(),
            "built fold sources"
        );
        Ok(FoldSources {
            train: self.loader(train, Split::Train)?,
            val: self.loader(val, Split::Val)?,
        })
    }
}
