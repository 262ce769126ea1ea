//! End-to-end entry points used by the binaries.

use std::path::Path;

use burn::module::Module;
use grasp_dataset::{
    CoTransform, FoldDatasetFactory, FoldLoaderSettings, GraspFoldFactory, TransformSet,
    TransformSetBuilder,
};
use grasp_metrics::GeometricMatchEvaluator;
use models::GraspNet;

use crate::config::TrainConfig;
use crate::context::{CancelToken, ExecutionContext};
use crate::cross_validation::CrossValidationReport;
use crate::epoch::{EpochRunner, EpochStats};
use crate::error::{TrainingError, TrainingResult};
use crate::loss::MseGraspLoss;
use crate::progress::TracingProgress;
use crate::session::{load_checkpoint, resolve_checkpoint, GraspNetTrainer};
use crate::{AutodiffTrainBackend, TrainBackend};

/// Training augmentation at the configured crop and input size.
pub fn train_transforms(cfg: &TrainConfig) -> TransformSet {
    TransformSetBuilder::new()
        .color_jitter(cfg.color_jitter)
        .co(CoTransform::RandomRotation { max_degrees: 40.0 })
        .co(CoTransform::RandomTranslation { max_pixels: 50 })
        .co(CoTransform::CenterCrop {
            size: cfg.crop_size,
        })
        .co(CoTransform::Resize {
            size: cfg.input_size,
        })
        .co(CoTransform::RandomVerticalFlip { prob: 0.5 })
        .co(CoTransform::RandomHorizontalFlip { prob: 0.5 })
        .target(cfg.target_encoding)
        .build()
}

pub fn val_transforms(cfg: &TrainConfig) -> TransformSet {
    TransformSetBuilder::new()
        .co(CoTransform::CenterCrop {
            size: cfg.crop_size,
        })
        .co(CoTransform::Resize {
            size: cfg.input_size,
        })
        .target(cfg.target_encoding)
        .build()
}

pub fn build_factory(cfg: &TrainConfig) -> TrainingResult<GraspFoldFactory> {
    let settings = FoldLoaderSettings {
        batch_size: cfg.batch_size,
        workers: cfg.workers,
        seed: cfg.seed,
        train_transforms: train_transforms(cfg),
        val_transforms: val_transforms(cfg),
    };
    tracing::info!(
        train = %settings.train_transforms.describe(),
        val = %settings.val_transforms.describe(),
        "transform pipelines"
    );
    Ok(GraspFoldFactory::from_csv(
        &cfg.annotations_path(),
        &cfg.dataset,
        cfg.num_folds,
        cfg.split,
        cfg.split_seed,
        settings,
    )?)
}

pub fn evaluator(cfg: &TrainConfig) -> GeometricMatchEvaluator {
    GeometricMatchEvaluator::new(cfg.criteria(), cfg.intersection)
}

pub fn write_report(path: &Path, report: &CrossValidationReport) -> TrainingResult<()> {
    let checkpoint_err = |message: String| TrainingError::Checkpoint {
        path: path.to_path_buf(),
        message,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| checkpoint_err(e.to_string()))?;
    }
    let json = serde_json::to_string_pretty(report).map_err(|e| checkpoint_err(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| checkpoint_err(e.to_string()))
}

/// Cross-validate a fresh (or restored) GraspNet per fold and write
/// `fold_<k>.bin` plus `report.json` into the checkpoint directory.
pub fn run_train(
    cfg: &TrainConfig,
    cancel: Option<CancelToken>,
) -> TrainingResult<CrossValidationReport> {
    cfg.validate()?;
    let ctx = ExecutionContext::<AutodiffTrainBackend>::default();
    let mut factory = build_factory(cfg)?;
    tracing::info!(
        grasps = factory.records().len(),
        folds = factory.num_folds(),
        "dataset loaded"
    );

    let mut runner = EpochRunner::new(ctx.clone(), evaluator(cfg))
        .with_batch_print_freq(cfg.batch_print_freq);
    if let Some(token) = cancel {
        runner = runner.with_cancel(token);
    }
    let mut trainer = GraspNetTrainer::new(ctx, cfg.model.clone(), cfg.sgd())
        .with_init(cfg.model_init());
    if !cfg.evaluate_only {
        trainer = trainer.with_checkpoint_dir(&cfg.checkpoint_dir);
    }

    let report = cfg.cross_validation().run(
        &runner,
        &mut factory,
        &mut trainer,
        &MseGraspLoss,
        &mut TracingProgress,
    )?;
    let report_path = cfg.checkpoint_dir.join("report.json");
    write_report(&report_path, &report)?;
    tracing::info!(
        mean_val_accuracy = report.mean_val_accuracy,
        path = %report_path.display(),
        "cross-validation complete"
    );
    Ok(report)
}

/// Score a checkpoint on the validation split of `fold`.
pub fn run_eval(cfg: &TrainConfig, checkpoint: &Path, fold: usize) -> TrainingResult<EpochStats> {
    cfg.validate()?;
    let ctx = ExecutionContext::<AutodiffTrainBackend>::default();
    let inner = ctx.inner();
    let path = resolve_checkpoint(checkpoint, fold);
    let model = load_checkpoint(
        GraspNet::<TrainBackend>::new(&cfg.model, inner.device()),
        &path,
        inner.device(),
    )?;
    tracing::info!(
        path = %path.display(),
        params = model.num_params(),
        fold,
        "loaded checkpoint"
    );
    let mut sources = build_factory(cfg)?.build(fold)?;
    let runner = EpochRunner::new(ctx, evaluator(cfg)).with_batch_print_freq(cfg.batch_print_freq);
    runner.validate_epoch(
        cfg.start_epoch,
        &mut sources.val,
        &model,
        &MseGraspLoss,
        &mut TracingProgress,
    )
}
