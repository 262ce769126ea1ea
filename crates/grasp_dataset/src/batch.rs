//! Batch assembly for Burn backends.

use burn::tensor::{backend::Backend, Tensor, TensorData};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::aug::TransformSet;
use crate::types::{DatasetError, DatasetResult, GraspRecord, GraspSample, SampleMeta};

/// One batch: `[n, 3, H, W]` images and `[n, 5]` grasp targets.
#[derive(Debug, Clone)]
pub struct GraspBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 2>,
    /// Annotation row of each sample.
    pub indices: Vec<usize>,
    pub meta: Vec<SampleMeta>,
}

impl<B: Backend> GraspBatch<B> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// A restartable, finite sequence of batches.
pub trait BatchSource {
    /// Number of batches one full pass yields.
    fn len_batches(&self) -> usize;

    /// Rewind to the first batch; shuffling sources draw a new order.
    fn restart(&mut self);

    fn next_batch<B: Backend>(&mut self, device: &B::Device)
        -> DatasetResult<Option<GraspBatch<B>>>;
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub batch_size: usize,
    pub shuffle: bool,
    /// Seeds both shuffling and per-sample augmentation.
    pub seed: Option<u64>,
    /// Drop the trailing partial batch.
    pub drop_last: bool,
    /// Threads used to decode and transform the samples of a batch.
    pub workers: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            shuffle: false,
            seed: None,
            drop_last: false,
            workers: 4,
        }
    }
}

impl LoaderConfig {
    pub fn build_pool(&self) -> DatasetResult<Arc<rayon::ThreadPool>> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers.max(1))
            .thread_name(|i| format!("grasp-loader-{i}"))
            .build()
            .map(Arc::new)
            .map_err(|e| DatasetError::Other(format!("failed to start loader pool: {e}")))
    }
}

/// [`BatchSource`] over a list of annotated grasps, decoding images from disk.
pub struct GraspLoader {
    records: Vec<GraspRecord>,
    order: Vec<usize>,
    cursor: usize,
    pass: u64,
    cfg: LoaderConfig,
    transforms: TransformSet,
    pool: Arc<rayon::ThreadPool>,
    rng: rand::rngs::StdRng,
    total_load_time: Duration,
}

impl GraspLoader {
    pub fn new(
        records: Vec<GraspRecord>,
        transforms: TransformSet,
        cfg: LoaderConfig,
        pool: Arc<rayon::ThreadPool>,
    ) -> DatasetResult<Self> {
        if cfg.batch_size == 0 {
            return Err(DatasetError::Other("batch_size must be at least 1".into()));
        }
        let rng = match cfg.seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_rng(&mut rand::rng()),
        };
        let order = (0..records.len()).collect();
        let mut loader = Self {
            records,
            order,
            cursor: 0,
            pass: 0,
            cfg,
            transforms,
            pool,
            rng,
            total_load_time: Duration::ZERO,
        };
        if loader.cfg.shuffle {
            loader.order.shuffle(&mut loader.rng);
        }
        Ok(loader)
    }

    pub fn len_samples(&self) -> usize {
        self.records.len()
    }

    pub fn transforms(&self) -> &TransformSet {
        &self.transforms
    }

    /// Time spent decoding and transforming since construction.
    pub fn total_load_time(&self) -> Duration {
        self.total_load_time
    }

    fn load_sample(&self, record: &GraspRecord) -> DatasetResult<GraspSample> {
        let img = image::open(&record.image)
            .map_err(|source| DatasetError::Image {
                path: record.image.clone(),
                source,
            })?
            .to_rgb8();
        let mut seeded;
        let mut local;
        let rng: &mut dyn rand::RngCore = match self.cfg.seed {
            Some(seed) => {
                let mixed = seed ^ (self.pass << 32) ^ record.index as u64;
                seeded = rand::rngs::StdRng::seed_from_u64(mixed);
                &mut seeded
            }
            None => {
                local = rand::rng();
                &mut local
            }
        };
        self.transforms.apply(img, record, rng)
    }
}

impl BatchSource for GraspLoader {
    fn len_batches(&self) -> usize {
        let n = self.records.len();
        let bs = self.cfg.batch_size;
        if self.cfg.drop_last {
            n / bs
        } else {
            n.div_ceil(bs)
        }
    }

    fn restart(&mut self) {
        self.cursor = 0;
        self.pass += 1;
        if self.cfg.shuffle {
            self.order.shuffle(&mut self.rng);
        }
    }

    fn next_batch<B: Backend>(
        &mut self,
        device: &B::Device,
    ) -> DatasetResult<Option<GraspBatch<B>>> {
        let bs = self.cfg.batch_size;
        if self.cursor >= self.order.len() {
            return Ok(None);
        }
        let end = (self.cursor + bs).min(self.order.len());
        if self.cfg.drop_last && end - self.cursor < bs {
            self.cursor = self.order.len();
            return Ok(None);
        }
        let slice = &self.order[self.cursor..end];
        self.cursor = end;

        let t_load = Instant::now();
        // Indexed parallel collect keeps slice order.
        let loaded: Vec<GraspSample> = self.pool.install(|| {
            slice
                .par_iter()
                .map(|&i| self.load_sample(&self.records[i]))
                .collect::<DatasetResult<Vec<_>>>()
        })?;
        let load_elapsed = t_load.elapsed();

        let (width, height) = match loaded.first() {
            Some(s) => (s.width, s.height),
            None => return Ok(None),
        };
        let n = loaded.len();
        let mut images = Vec::with_capacity(n * 3 * (width * height) as usize);
        let mut targets = Vec::with_capacity(n * 5);
        let mut indices = Vec::with_capacity(n);
        let mut meta = Vec::with_capacity(n);
        for sample in loaded {
            if (sample.width, sample.height) != (width, height) {
                return Err(DatasetError::ShapeMismatch(format!(
                    "batch mixes {}x{} and {}x{} images; add a resize transform",
                    width, height, sample.width, sample.height
                )));
            }
            images.extend_from_slice(&sample.image_chw);
            targets.extend_from_slice(&sample.target);
            indices.push(sample.index);
            meta.push(sample.meta);
        }
        self.total_load_time += load_elapsed;
        tracing::trace!(
            samples = n,
            width,
            height,
            load_ms = load_elapsed.as_secs_f64() * 1000.0,
            "assembled grasp batch"
        );

        Ok(Some(GraspBatch {
            images: Tensor::from_data(
                TensorData::new(images, [n, 3, height as usize, width as usize]),
                device,
            ),
            targets: Tensor::from_data(TensorData::new(targets, [n, 5]), device),
            indices,
            meta,
        }))
    }
}
