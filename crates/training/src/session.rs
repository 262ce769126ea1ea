//! GraspNet fold setup: fresh or restored weights, optional backbone freezing,
//! and per-fold checkpoints.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::{AutodiffBackend, Backend};
use models::{GraspNet, GraspNetConfig};

use crate::context::ExecutionContext;
use crate::cross_validation::{FoldReport, FoldTrainer};
use crate::error::{TrainingError, TrainingResult};
use crate::optim::{sgd, SgdSettings, SgdStep};

/// Where a fold's starting weights come from.
#[derive(Debug, Clone, Default)]
pub struct ModelInit {
    /// Resume training from a checkpoint (file, or a directory of `fold_<k>.bin`).
    pub resume: Option<PathBuf>,
    /// Start from pretrained weights (same layout as `resume`).
    pub pretrained: Option<PathBuf>,
    /// Keep the backbone trainable when starting from pretrained weights.
    pub train_all: bool,
}

pub fn fold_checkpoint_name(fold: usize) -> String {
    format!("fold_{fold}.bin")
}

/// A directory resolves to its per-fold file; a file is used for every fold.
pub fn resolve_checkpoint(path: &Path, fold: usize) -> PathBuf {
    if path.is_dir() {
        path.join(fold_checkpoint_name(fold))
    } else {
        path.to_path_buf()
    }
}

pub fn save_checkpoint<B: Backend, M: Module<B>>(model: &M, path: &Path) -> TrainingResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TrainingError::Checkpoint {
            path: parent.to_path_buf(),
            message: e.to_string(),
        })?;
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(path, &recorder)
        .map_err(|e| TrainingError::Checkpoint {
            path: path.to_path_buf(),
            message: format!("failed to save: {e}"),
        })?;
    tracing::debug!(path = %path.display(), "saved checkpoint");
    Ok(())
}

/// Load weights from `path` into `model`; the record must match its architecture.
pub fn load_checkpoint<B: Backend, M: Module<B>>(
    model: M,
    path: &Path,
    device: &B::Device,
) -> TrainingResult<M> {
    if !path.is_file() {
        return Err(TrainingError::Checkpoint {
            path: path.to_path_buf(),
            message: "no such checkpoint".into(),
        });
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .load_file(path, &recorder, device)
        .map_err(|e| TrainingError::Checkpoint {
            path: path.to_path_buf(),
            message: format!("failed to load: {e}"),
        })
}

pub struct GraspNetTrainer<B: AutodiffBackend> {
    ctx: ExecutionContext<B>,
    model: GraspNetConfig,
    sgd: SgdSettings,
    init: ModelInit,
    checkpoint_dir: Option<PathBuf>,
}

impl<B: AutodiffBackend> GraspNetTrainer<B> {
    pub fn new(ctx: ExecutionContext<B>, model: GraspNetConfig, sgd: SgdSettings) -> Self {
        Self {
            ctx,
            model,
            sgd,
            init: ModelInit::default(),
            checkpoint_dir: None,
        }
    }

    pub fn with_init(mut self, init: ModelInit) -> Self {
        self.init = init;
        self
    }

    /// Write `fold_<k>.bin` here after each fold.
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    fn initial_model(&self, fold: usize) -> TrainingResult<GraspNet<B>> {
        let device = self.ctx.device();
        let model = GraspNet::new(&self.model, device);
        if let Some(resume) = &self.init.resume {
            let path = resolve_checkpoint(resume, fold);
            tracing::info!(fold, path = %path.display(), "resuming from checkpoint");
            return load_checkpoint(model, &path, device);
        }
        if let Some(pretrained) = &self.init.pretrained {
            let path = resolve_checkpoint(pretrained, fold);
            tracing::info!(
                fold,
                path = %path.display(),
                train_all = self.init.train_all,
                "loading pretrained weights"
            );
            let model = load_checkpoint(model, &path, device)?;
            return Ok(if self.init.train_all {
                model
            } else {
                model.freeze_backbone()
            });
        }
        Ok(model)
    }
}

impl<B: AutodiffBackend> FoldTrainer<B> for GraspNetTrainer<B> {
    type Model = GraspNet<B>;
    type Optimizer = SgdStep<B, GraspNet<B>>;

    fn init_fold(&mut self, fold: usize) -> TrainingResult<(Self::Model, Self::Optimizer)> {
        let model = self.initial_model(fold)?;
        Ok((model, sgd::<B, GraspNet<B>>(&self.sgd)))
    }

    fn finish_fold(
        &mut self,
        fold: usize,
        model: &Self::Model,
        _report: &FoldReport,
    ) -> TrainingResult<()> {
        if let Some(dir) = &self.checkpoint_dir {
            let path = dir.join(fold_checkpoint_name(fold));
            save_checkpoint(model, &path)?;
            tracing::info!(fold, path = %path.display(), "saved fold checkpoint");
        }
        Ok(())
    }
}
