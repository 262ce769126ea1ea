#![allow(dead_code)]

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module, Param};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{Tensor, TensorData};
use grasp_dataset::{
    BatchSource, DatasetError, DatasetResult, FoldDatasetFactory, FoldSources, GraspBatch,
    SampleMeta,
};
use models::GraspRegressor;
use training::{
    BatchProgress, EpochSummary, FoldReport, FoldTrainer, ParameterStep, ProgressSink,
    TrainingResult,
};

pub type Inner = NdArray<f32>;
pub type AD = Autodiff<Inner>;

/// Returns its `[n, 1, 1, 5]` input reshaped to `[n, 5]`, scaled by one parameter.
#[derive(Module, Debug)]
pub struct Echo<B: Backend> {
    scale: Param<Tensor<B, 1>>,
}

impl<B: Backend> Echo<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            scale: Param::from_tensor(Tensor::ones([1], device)),
        }
    }
}

impl<B: Backend> GraspRegressor<B> for Echo<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let n = images.dims()[0];
        images.reshape([n, 5]) * self.scale.val().unsqueeze::<2>()
    }
}

pub fn grasp_row(i: usize) -> [f32; 5] {
    [10.0 * i as f32 + 5.0, 5.0, 4.0, 2.0, 0.0]
}

struct MockBatch {
    indices: Vec<usize>,
    predicted: Vec<f32>,
    target: Vec<f32>,
}

/// Batches whose "images" are the predictions an [`Echo`] model will make.
pub struct MockSource {
    batches: Vec<MockBatch>,
    cursor: usize,
    fail_at: Option<usize>,
    pub yielded: Vec<usize>,
    pub restarts: usize,
}

impl MockSource {
    /// Perfect predictions, batches of the given sizes, sample indices counting from 0.
    pub fn matching(sizes: &[usize]) -> Self {
        Self::with_target(sizes, |_, row| row)
    }

    /// Predictions are `grasp_row(i)`; targets are `target(i, grasp_row(i))`.
    pub fn with_target(sizes: &[usize], target: impl Fn(usize, [f32; 5]) -> [f32; 5]) -> Self {
        let mut next = 0;
        let batches = sizes
            .iter()
            .map(|&n| {
                let indices: Vec<usize> = (next..next + n).collect();
                next += n;
                MockBatch {
                    predicted: indices.iter().flat_map(|&i| grasp_row(i)).collect(),
                    target: indices
                        .iter()
                        .flat_map(|&i| target(i, grasp_row(i)))
                        .collect(),
                    indices,
                }
            })
            .collect();
        Self {
            batches,
            cursor: 0,
            fail_at: None,
            yielded: Vec::new(),
            restarts: 0,
        }
    }

    pub fn failing_at(mut self, batch: usize) -> Self {
        self.fail_at = Some(batch);
        self
    }
}

impl BatchSource for MockSource {
    fn len_batches(&self) -> usize {
        self.batches.len()
    }

    fn restart(&mut self) {
        self.cursor = 0;
        self.restarts += 1;
    }

    fn next_batch<B: Backend>(
        &mut self,
        device: &B::Device,
    ) -> DatasetResult<Option<GraspBatch<B>>> {
        if self.fail_at == Some(self.cursor) {
            return Err(DatasetError::Other("unreadable sample".into()));
        }
        let Some(batch) = self.batches.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        let n = batch.indices.len();
        self.yielded.extend(&batch.indices);
        Ok(Some(GraspBatch {
            images: Tensor::from_data(
                TensorData::new(batch.predicted.clone(), [n, 1, 1, 5]),
                device,
            ),
            targets: Tensor::from_data(TensorData::new(batch.target.clone(), [n, 5]), device),
            indices: batch.indices.clone(),
            meta: batch
                .indices
                .iter()
                .map(|i| SampleMeta {
                    image: PathBuf::from(format!("{i}.png")),
                    object: String::new(),
                })
                .collect(),
        }))
    }
}

/// Shared, ordered log of optimizer calls.
pub type CallLog = Rc<RefCell<Vec<&'static str>>>;

pub struct CountingStep {
    pub log: CallLog,
}

impl<B: AutodiffBackend, M: AutodiffModule<B>> ParameterStep<B, M> for CountingStep {
    fn zero_grad(&mut self) {
        self.log.borrow_mut().push("zero_grad");
    }

    fn step(&mut self, model: M, _loss: Tensor<B, 1>) -> M {
        self.log.borrow_mut().push("step");
        model
    }
}

pub fn steps(log: &CallLog) -> usize {
    log.borrow().iter().filter(|c| **c == "step").count()
}

#[derive(Default)]
pub struct RecordingSink {
    pub batches: Vec<BatchProgress>,
    pub epochs: Vec<EpochSummary>,
    pub ready: Vec<usize>,
    pub complete: Vec<usize>,
}

impl ProgressSink for RecordingSink {
    fn on_batch(&mut self, progress: &BatchProgress) {
        self.batches.push(progress.clone());
    }
    fn on_epoch(&mut self, summary: &EpochSummary) {
        self.epochs.push(summary.clone());
    }
    fn on_fold_ready(&mut self, fold: usize, _train: usize, _val: usize) {
        self.ready.push(fold);
    }
    fn on_fold_complete(&mut self, report: &FoldReport) {
        self.complete.push(report.fold);
    }
}

pub struct MockFactory {
    pub train_sizes: Vec<usize>,
    pub val_sizes: Vec<usize>,
    pub built: Vec<usize>,
}

impl MockFactory {
    pub fn new(train_sizes: &[usize], val_sizes: &[usize]) -> Self {
        Self {
            train_sizes: train_sizes.to_vec(),
            val_sizes: val_sizes.to_vec(),
            built: Vec::new(),
        }
    }
}

impl FoldDatasetFactory for MockFactory {
    type Source = MockSource;

    fn build(&mut self, fold: usize) -> DatasetResult<FoldSources<MockSource>> {
        self.built.push(fold);
        Ok(FoldSources {
            train: MockSource::matching(&self.train_sizes),
            val: MockSource::matching(&self.val_sizes),
        })
    }
}

pub struct MockTrainer {
    pub log: CallLog,
    pub initialised: Vec<usize>,
    pub finished: Vec<usize>,
}

impl MockTrainer {
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            initialised: Vec::new(),
            finished: Vec::new(),
        }
    }
}

impl FoldTrainer<AD> for MockTrainer {
    type Model = Echo<AD>;
    type Optimizer = CountingStep;

    fn init_fold(&mut self, fold: usize) -> TrainingResult<(Echo<AD>, CountingStep)> {
        self.initialised.push(fold);
        Ok((
            Echo::new(&Default::default()),
            CountingStep {
                log: Rc::clone(&self.log),
            },
        ))
    }

    fn finish_fold(
        &mut self,
        fold: usize,
        _model: &Echo<AD>,
        _report: &FoldReport,
    ) -> TrainingResult<()> {
        self.finished.push(fold);
        Ok(())
    }
}
