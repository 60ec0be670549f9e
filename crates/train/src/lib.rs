//! Training configuration glue for the capsule-network experiments.
//!
//! - [`registry`]: per-dataset normalization, augmentation and model geometry.
//! - [`transforms`]: crop/flip/tensor/normalize pipelines.
//! - [`sources`]: readers for the on-disk dataset formats.
//! - [`loader`]: batching iterator with transforms run on a `rayon` pool.
//! - [`loss`]: focal and cross-entropy losses.
//! - [`stats`]: channel statistics used to derive normalization values.

pub mod dataset;
pub mod error;
pub mod image;
pub mod loader;
pub mod loss;
pub mod model;
pub mod registry;
pub mod sources;
pub mod stats;
pub mod transforms;

use std::path::Path;

pub use dataset::DatasetKind;
pub use error::TrainError;
pub use loader::{Batch, DataLoader};
pub use loss::{ClassificationLoss, CrossEntropyLoss, FocalLoss, Reduction};
pub use model::{ModelBuilder, ModelSpec};
pub use registry::{DatasetEntry, DatasetRegistry};
pub use transforms::{build_pipeline, Mode};

/// Build a batch iterator over one split of `kind`.
///
/// Training iterators shuffle; test iterators keep file order. Samples are
/// transformed on a pool of [`loader::DEFAULT_NUM_WORKERS`] threads.
pub fn get_iterator(
    registry: &DatasetRegistry,
    data_root: &Path,
    mode: Mode,
    kind: DatasetKind,
    batch_size: usize,
    augment: bool,
) -> Result<DataLoader, TrainError> {
    let entry = registry
        .get(kind)
        .ok_or_else(|| TrainError::UnknownDataset(kind.to_string()))?;
    let samples = sources::load_split(data_root, entry, mode)?;
    let pipeline = build_pipeline(entry, mode, augment);
    DataLoader::new(samples, pipeline, batch_size, mode.is_train())
}
