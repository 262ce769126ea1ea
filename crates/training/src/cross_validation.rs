//! K-fold orchestration: one independent model per fold, trained and validated
//! on that fold's split.

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use grasp_dataset::{BatchSource, FoldDatasetFactory};
use models::GraspRegressor;
use serde::Serialize;

use crate::epoch::EpochRunner;
use crate::error::{TrainingError, TrainingResult};
use crate::loss::GraspLoss;
use crate::optim::ParameterStep;
use crate::progress::{EpochSummary, ProgressSink};

/// Supplies a fresh model and optimizer for each fold and receives the result.
pub trait FoldTrainer<B: AutodiffBackend> {
    type Model: AutodiffModule<B> + GraspRegressor<B>;
    type Optimizer: ParameterStep<B, Self::Model>;

    fn init_fold(&mut self, fold: usize) -> TrainingResult<(Self::Model, Self::Optimizer)>;

    fn finish_fold(
        &mut self,
        _fold: usize,
        _model: &Self::Model,
        _report: &FoldReport,
    ) -> TrainingResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FoldReport {
    pub fold: usize,
    pub epochs: Vec<EpochSummary>,
    pub final_val_accuracy: f64,
    pub final_val_loss: f64,
    pub best_val_accuracy: f64,
    pub best_epoch: usize,
}

impl FoldReport {
    fn from_epochs(fold: usize, epochs: Vec<EpochSummary>) -> Self {
        let (final_val_accuracy, final_val_loss) = epochs
            .last()
            .map(|e| (e.val.accuracy, e.val.loss))
            .unwrap_or((0.0, 0.0));
        let (best_epoch, best_val_accuracy) = epochs
            .iter()
            .map(|e| (e.epoch, e.val.accuracy))
            .fold((0, f64::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        Self {
            fold,
            final_val_accuracy,
            final_val_loss,
            best_val_accuracy: best_val_accuracy.max(0.0),
            best_epoch,
            epochs,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossValidationReport {
    pub folds: Vec<FoldReport>,
    /// Mean of the per-fold final validation accuracy.
    pub mean_val_accuracy: f64,
}

impl CrossValidationReport {
    fn new(folds: Vec<FoldReport>) -> Self {
        let mean_val_accuracy = if folds.is_empty() {
            0.0
        } else {
            folds.iter().map(|f| f.final_val_accuracy).sum::<f64>() / folds.len() as f64
        };
        Self {
            folds,
            mean_val_accuracy,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrossValidation {
    pub num_folds: usize,
    /// Exclusive upper bound of the epoch range.
    pub epochs: usize,
    pub start_epoch: usize,
    pub epoch_print_freq: usize,
    /// Skip training; run one validation pass per fold.
    pub evaluate_only: bool,
}

impl Default for CrossValidation {
    fn default() -> Self {
        Self {
            num_folds: 5,
            epochs: 1000,
            start_epoch: 0,
            epoch_print_freq: 1,
            evaluate_only: false,
        }
    }
}

impl CrossValidation {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.num_folds == 0 {
            return Err(TrainingError::Config("num_folds must be at least 1".into()));
        }
        if !self.evaluate_only && self.epochs <= self.start_epoch {
            return Err(TrainingError::Config(format!(
                "epochs ({}) must exceed start_epoch ({})",
                self.epochs, self.start_epoch
            )));
        }
        Ok(())
    }

    fn should_print(&self, epoch: usize) -> bool {
        epoch + 1 == self.epochs
            || (self.epoch_print_freq > 0
                && (epoch - self.start_epoch + 1) % self.epoch_print_freq == 0)
    }

    /// Folds run in ascending order; any error aborts the whole run.
    pub fn run<B, F, T, L>(
        &self,
        runner: &EpochRunner<B>,
        factory: &mut F,
        trainer: &mut T,
        loss: &L,
        sink: &mut dyn ProgressSink,
    ) -> TrainingResult<CrossValidationReport>
    where
        B: AutodiffBackend,
        F: FoldDatasetFactory,
        T: FoldTrainer<B>,
        <T::Model as AutodiffModule<B>>::InnerModule: GraspRegressor<B::InnerBackend>,
        L: GraspLoss,
    {
        self.validate()?;
        let mut reports = Vec::with_capacity(self.num_folds);
        for fold in 0..self.num_folds {
            let mut sources = factory.build(fold)?;
            sink.on_fold_ready(
                fold,
                sources.train.len_batches(),
                sources.val.len_batches(),
            );
            let (mut model, mut optimizer) = trainer.init_fold(fold)?;
            let mut epochs = Vec::new();

            if self.evaluate_only {
                let val = runner.validate_epoch(
                    self.start_epoch,
                    &mut sources.val,
                    &model.valid(),
                    loss,
                    sink,
                )?;
                let summary = EpochSummary {
                    fold,
                    epoch: self.start_epoch,
                    train: None,
                    val,
                };
                sink.on_epoch(&summary);
                epochs.push(summary);
            } else {
                for epoch in self.start_epoch..self.epochs {
                    let (trained, train) = runner.train_epoch(
                        epoch,
                        &mut sources.train,
                        model,
                        loss,
                        &mut optimizer,
                        sink,
                    )?;
                    model = trained;
                    let val =
                        runner.validate_epoch(epoch, &mut sources.val, &model.valid(), loss, sink)?;
                    let summary = EpochSummary {
                        fold,
                        epoch,
                        train: Some(train),
                        val,
                    };
                    if self.should_print(epoch) {
                        sink.on_epoch(&summary);
                    }
                    epochs.push(summary);
                }
            }

            let report = FoldReport::from_epochs(fold, epochs);
            trainer.finish_fold(fold, &model, &report)?;
            sink.on_fold_complete(&report);
            reports.push(report);
        }
        Ok(CrossValidationReport::new(reports))
    }
}
