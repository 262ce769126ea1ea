//! One pass over a batch source: training with parameter updates, or validation.

use std::time::{Duration, Instant};

use burn::module::AutodiffModule;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use grasp_dataset::BatchSource;
use grasp_metrics::{GeometricMatchEvaluator, MetricsError, RunningStatistic};
use models::GraspRegressor;
use serde::Serialize;

use crate::context::{CancelToken, ExecutionContext};
use crate::error::{TrainingError, TrainingResult};
use crate::loss::GraspLoss;
use crate::optim::ParameterStep;
use crate::progress::{BatchProgress, Phase, ProgressSink};

#[derive(Debug, Clone, Serialize)]
pub struct EpochStats {
    /// Sample-weighted mean loss.
    pub loss: f64,
    /// Sample-weighted fraction of correct grasps.
    pub accuracy: f64,
    pub batches: usize,
    pub samples: usize,
    pub elapsed: Duration,
}

/// Fraction of correct grasps in `[n, 5]` output/target tensors.
pub fn evaluate_tensors<B: Backend>(
    evaluator: &GeometricMatchEvaluator,
    output: Tensor<B, 2>,
    target: Tensor<B, 2>,
) -> TrainingResult<f64> {
    for dims in [output.dims(), target.dims()] {
        if dims[1] != grasp_contracts::GRASP_PARAMS {
            return Err(MetricsError::InvalidShape(dims.to_vec()).into());
        }
    }
    let output = to_host(output)?;
    let target = to_host(target)?;
    Ok(evaluator.evaluate_flat(&output, &target)?)
}

fn to_host<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> TrainingResult<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| TrainingError::Backend(format!("failed to read tensor data: {e:?}")))
}

fn scalar<B: Backend>(loss: Tensor<B, 1>) -> TrainingResult<f64> {
    to_host(loss)?
        .first()
        .map(|v| *v as f64)
        .ok_or_else(|| TrainingError::Backend("loss tensor is empty".into()))
}

/// Per-phase meters, fresh for every epoch.
struct Meters {
    batch_time: RunningStatistic,
    data_time: RunningStatistic,
    loss: RunningStatistic,
    accuracy: RunningStatistic,
    batches: usize,
    samples: usize,
    started: Instant,
    last: Instant,
}

impl Meters {
    fn start() -> Self {
        let now = Instant::now();
        Self {
            batch_time: RunningStatistic::new(),
            data_time: RunningStatistic::new(),
            loss: RunningStatistic::new(),
            accuracy: RunningStatistic::new(),
            batches: 0,
            samples: 0,
            started: now,
            last: now,
        }
    }

    fn loaded(&mut self) {
        self.data_time.update(self.last.elapsed().as_secs_f64(), 1);
    }

    fn finish_batch(&mut self, n: usize, loss: f64, accuracy: f64) {
        self.loss.update(loss, n as u64);
        self.accuracy.update(accuracy, n as u64);
        self.batch_time.update(self.last.elapsed().as_secs_f64(), 1);
        self.last = Instant::now();
        self.batches += 1;
        self.samples += n;
    }

    fn progress(&self, phase: Phase, epoch: usize, total_batches: usize) -> BatchProgress {
        BatchProgress {
            phase,
            epoch,
            batch_index: self.batches,
            total_batches,
            batch_time: self.batch_time,
            data_time: self.data_time,
            loss: self.loss,
            accuracy: self.accuracy,
        }
    }

    fn stats(&self) -> EpochStats {
        EpochStats {
            loss: self.loss.average,
            accuracy: self.accuracy.average,
            batches: self.batches,
            samples: self.samples,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Drives training and validation epochs on one device.
pub struct EpochRunner<B: AutodiffBackend> {
    ctx: ExecutionContext<B>,
    evaluator: GeometricMatchEvaluator,
    batch_print_freq: usize,
    cancel: Option<CancelToken>,
}

impl<B: AutodiffBackend> EpochRunner<B> {
    pub fn new(ctx: ExecutionContext<B>, evaluator: GeometricMatchEvaluator) -> Self {
        Self {
            ctx,
            evaluator,
            batch_print_freq: 10,
            cancel: None,
        }
    }

    /// Emit batch progress every `freq` batches; `0` keeps only the final batch.
    pub fn with_batch_print_freq(mut self, freq: usize) -> Self {
        self.batch_print_freq = freq;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn context(&self) -> &ExecutionContext<B> {
        &self.ctx
    }

    pub fn evaluator(&self) -> &GeometricMatchEvaluator {
        &self.evaluator
    }

    fn check_cancelled(&self) -> TrainingResult<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(TrainingError::Cancelled),
            _ => Ok(()),
        }
    }

    fn should_report(&self, batch_index: usize, total: usize) -> bool {
        batch_index == total
            || (self.batch_print_freq > 0 && batch_index % self.batch_print_freq == 0)
    }

    /// One optimisation pass over `source`, in source order.
    pub fn train_epoch<S, M, L, O>(
        &self,
        epoch: usize,
        source: &mut S,
        mut model: M,
        loss_fn: &L,
        optimizer: &mut O,
        sink: &mut dyn ProgressSink,
    ) -> TrainingResult<(M, EpochStats)>
    where
        S: BatchSource,
        M: AutodiffModule<B> + GraspRegressor<B>,
        L: GraspLoss,
        O: ParameterStep<B, M>,
    {
        source.restart();
        let total = source.len_batches();
        let mut meters = Meters::start();
        loop {
            self.check_cancelled()?;
            let Some(batch) = source.next_batch::<B>(self.ctx.device())? else {
                break;
            };
            meters.loaded();
            let n = batch.len();
            let images = self.ctx.place(batch.images);
            let targets = self.ctx.place(batch.targets);

            let output = model.forward(images);
            let loss = loss_fn.loss(output.clone(), targets.clone());
            let loss_value = scalar(loss.clone().detach())?;
            let accuracy = evaluate_tensors(&self.evaluator, output.detach(), targets)?;

            optimizer.zero_grad();
            model = optimizer.step(model, loss);

            meters.finish_batch(n, loss_value, accuracy);
            if self.should_report(meters.batches, total) {
                sink.on_batch(&meters.progress(Phase::Train, epoch, total));
            }
        }
        Ok((model, meters.stats()))
    }

    /// One inference pass over `source`; `model` is the `valid()` form of the
    /// training module, so dropout is off and no optimizer is involved.
    pub fn validate_epoch<S, R, L>(
        &self,
        epoch: usize,
        source: &mut S,
        model: &R,
        loss_fn: &L,
        sink: &mut dyn ProgressSink,
    ) -> TrainingResult<EpochStats>
    where
        S: BatchSource,
        R: GraspRegressor<B::InnerBackend>,
        L: GraspLoss,
    {
        let ctx = self.ctx.inner();
        source.restart();
        let total = source.len_batches();
        let mut meters = Meters::start();
        loop {
            self.check_cancelled()?;
            let Some(batch) = source.next_batch::<B::InnerBackend>(ctx.device())? else {
                break;
            };
            meters.loaded();
            let n = batch.len();
            let images = ctx.place(batch.images);
            let targets = ctx.place(batch.targets);

            let output = model.forward(images);
            let loss = scalar(loss_fn.loss(output.clone(), targets.clone()))?;
            let accuracy = evaluate_tensors(&self.evaluator, output, targets)?;

            meters.finish_batch(n, loss, accuracy);
            if self.should_report(meters.batches, total) {
                sink.on_batch(&meters.progress(Phase::Validate, epoch, total));
            }
        }
        Ok(meters.stats())
    }
}
