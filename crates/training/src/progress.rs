//! Progress reporting for epochs and folds.

use grasp_metrics::RunningStatistic;
use serde::Serialize;

use crate::cross_validation::FoldReport;
use crate::epoch::EpochStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Train,
    Validate,
}

/// Snapshot emitted every `batch_print_freq` batches and on the final batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    pub phase: Phase,
    pub epoch: usize,
    /// 1-based.
    pub batch_index: usize,
    pub total_batches: usize,
    /// Seconds per batch, including data loading.
    pub batch_time: RunningStatistic,
    /// Seconds spent waiting on the batch source.
    pub data_time: RunningStatistic,
    pub loss: RunningStatistic,
    pub accuracy: RunningStatistic,
}

#[derive(Debug, Clone, Serialize)]
pub struct EpochSummary {
    pub fold: usize,
    pub epoch: usize,
    /// `None` in evaluate-only runs.
    pub train: Option<EpochStats>,
    pub val: EpochStats,
}

pub trait ProgressSink {
    fn on_batch(&mut self, _progress: &BatchProgress) {}
    fn on_epoch(&mut self, _summary: &EpochSummary) {}
    fn on_fold_ready(&mut self, _fold: usize, _train_batches: usize, _val_batches: usize) {}
    fn on_fold_complete(&mut self, _report: &FoldReport) {}
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {}

/// Logs progress as structured `tracing` events.
#[derive(Debug, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_batch(&mut self, p: &BatchProgress) {
        tracing::info!(
            phase = ?p.phase,
            epoch = p.epoch,
            batch = p.batch_index,
            total = p.total_batches,
            batch_time = p.batch_time.value,
            batch_time_avg = p.batch_time.average,
            data_time = p.data_time.value,
            data_time_avg = p.data_time.average,
            loss = p.loss.value,
            loss_avg = p.loss.average,
            accuracy = p.accuracy.value,
            accuracy_avg = p.accuracy.average,
            "batch"
        );
    }

    fn on_epoch(&mut self, s: &EpochSummary) {
        match &s.train {
            Some(train) => tracing::info!(
                fold = s.fold,
                epoch = s.epoch,
                train_loss = train.loss,
                train_accuracy = train.accuracy,
                val_loss = s.val.loss,
                val_accuracy = s.val.accuracy,
                elapsed_s = (train.elapsed + s.val.elapsed).as_secs_f64(),
                "epoch complete"
            ),
            None => tracing::info!(
                fold = s.fold,
                epoch = s.epoch,
                val_loss = s.val.loss,
                val_accuracy = s.val.accuracy,
                "evaluation complete"
            ),
        }
    }

    fn on_fold_ready(&mut self, fold: usize, train_batches: usize, val_batches: usize) {
        tracing::info!(fold, train_batches, val_batches, "fold datasets ready");
    }

    fn on_fold_complete(&mut self, report: &FoldReport) {
        tracing::info!(
            fold = report.fold,
            final_val_accuracy = report.final_val_accuracy,
            best_val_accuracy = report.best_val_accuracy,
            best_epoch = report.best_epoch,
            "fold complete"
        );
    }
}
