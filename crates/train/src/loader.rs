//! Batching iterator over an in-memory dataset split.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::TrainError;
use crate::image::Tensor;
use crate::sources::Sample;
use crate::transforms::TransformPipeline;

/// Threads in the pool applying transforms to each batch.
pub const DEFAULT_NUM_WORKERS: usize = 4;

/// One batch of transformed samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Samples concatenated in `[n, c, h, w]` order.
    pub inputs: Vec<f32>,
    pub shape: [usize; 4],
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Iterates over a split in batches, applying the transform pipeline to
/// every sample as it is yielded. One pass is one epoch; call
/// [`DataLoader::reset`] to start the next.
pub struct DataLoader {
    samples: Vec<Sample>,
    pipeline: TransformPipeline,
    batch_size: usize,
    shuffle: bool,
    pool: rayon::ThreadPool,
    order: Vec<usize>,
    cursor: usize,
    rng: StdRng,
}

impl DataLoader {
    /// `batch_size` of zero is treated as one.
    pub fn new(
        samples: Vec<Sample>,
        pipeline: TransformPipeline,
        batch_size: usize,
        shuffle: bool,
    ) -> Result<Self, TrainError> {
        Self::with_rng(samples, pipeline, batch_size, shuffle, StdRng::from_os_rng())
    }

    /// Like [`DataLoader::new`] with a reproducible shuffle and augmentation.
    pub fn seeded(
        samples: Vec<Sample>,
        pipeline: TransformPipeline,
        batch_size: usize,
        shuffle: bool,
        seed: u64,
    ) -> Result<Self, TrainError> {
        Self::with_rng(samples, pipeline, batch_size, shuffle, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        samples: Vec<Sample>,
        pipeline: TransformPipeline,
        batch_size: usize,
        shuffle: bool,
        rng: StdRng,
    ) -> Result<Self, TrainError> {
        let mut loader = Self {
            order: (0..samples.len()).collect(),
            samples,
            pipeline,
            batch_size: batch_size.max(1),
            shuffle,
            pool: transform_pool(DEFAULT_NUM_WORKERS)?,
            cursor: 0,
            rng,
        };
        loader.reset();
        Ok(loader)
    }

    /// Replace the transform pool with one of `num_workers` threads.
    pub fn with_workers(mut self, num_workers: usize) -> Result<Self, TrainError> {
        self.pool = transform_pool(num_workers)?;
        Ok(self)
    }

    /// Rewind to the first batch, reshuffling when shuffling is enabled.
    pub fn reset(&mut self) {
        self.cursor = 0;
        if self.shuffle {
            self.order.shuffle(&mut self.rng);
        }
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn shuffles(&self) -> bool {
        self.shuffle
    }

    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    pub fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Batches per epoch, counting a final partial batch.
    pub fn num_batches(&self) -> usize {
        self.samples.len().div_ceil(self.batch_size)
    }

    fn transform(&self, indices: &[usize], seeds: &[u64]) -> Vec<Tensor> {
        let pipeline = &self.pipeline;
        let samples = &self.samples;
        self.pool.install(|| {
            indices
                .par_iter()
                .zip(seeds)
                .map(|(&i, &seed)| {
                    let mut rng = StdRng::seed_from_u64(seed);
                    pipeline.apply(&samples[i].image, &mut rng)
                })
                .collect()
        })
    }
}

fn transform_pool(num_workers: usize) -> Result<rayon::ThreadPool, TrainError> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers.max(1))
        .thread_name(|i| format!("capsnet-transform-{i}"))
        .build()?)
}

impl Iterator for DataLoader {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let indices = self.order[self.cursor..end].to_vec();
        self.cursor = end;

        // Per-sample seeds keep augmentation independent of the worker split.
        let seeds: Vec<u64> = indices.iter().map(|_| self.rng.random()).collect();
        let tensors = self.transform(&indices, &seeds);

        let [c, h, w] = tensors.first().map(|t| t.shape).unwrap_or([0, 0, 0]);
        let mut inputs = Vec::with_capacity(tensors.len() * c * h * w);
        for tensor in &tensors {
            inputs.extend_from_slice(&tensor.data);
        }

        Some(Batch {
            inputs,
            shape: [tensors.len(), c, h, w],
            labels: indices.iter().map(|&i| self.samples[i].label).collect(),
        })
    }
}
