//! Per-dataset training configuration.
//!
//! [`DatasetRegistry::standard`] holds everything the iterator factory and
//! model construction need for each [`DatasetKind`]: where the data comes
//! from, normalization statistics, augmentation geometry, the paired model
//! and class names. Build it once and pass it to consumers.

use indexmap::IndexMap;

use crate::dataset::DatasetKind;
use crate::error::TrainError;
use crate::model::ModelSpec;

/// On-disk layout of a dataset under `<data_root>/<NAME>/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// IDX files in `<NAME>/raw/`.
    Idx,
    /// `cifar-10-batches-bin/`
    Cifar10Binary,
    /// `cifar-100-binary/`, fine labels.
    Cifar100Binary,
    /// `stl10_binary/`, column-major images with 1-based labels.
    Stl10Binary,
    /// `svhn-binary/`, CIFAR-10 record layout.
    SvhnBinary,
}

/// Per-channel normalization: `(x - mean) / std`.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl Normalization {
    pub fn new(mean: &[f32], std: &[f32]) -> Self {
        Self {
            mean: mean.to_vec(),
            std: std.to_vec(),
        }
    }
}

/// Training-time augmentation geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AugmentSpec {
    pub crop_size: usize,
    pub padding: usize,
    pub horizontal_flip: bool,
}

#[derive(Debug, Clone)]
pub struct DatasetEntry {
    pub kind: DatasetKind,
    pub source: SourceFormat,
    pub normalization: Normalization,
    pub augment: AugmentSpec,
    pub model: ModelSpec,
    pub class_names: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    entries: IndexMap<DatasetKind, DatasetEntry>,
}

impl DatasetRegistry {
    /// The six supported datasets with their published statistics.
    pub fn standard() -> Self {
        let entries = [
            entry(
                DatasetKind::Mnist,
                SourceFormat::Idx,
                Normalization::new(&[0.1307], &[0.3081]),
                (28, 2, false),
                ("MNISTCapsuleNet", 1, 28),
            ),
            entry(
                DatasetKind::FashionMnist,
                SourceFormat::Idx,
                Normalization::new(&[0.2860], &[0.3530]),
                (28, 2, true),
                ("FashionMNISTCapsuleNet", 1, 28),
            ),
            entry(
                DatasetKind::Svhn,
                SourceFormat::SvhnBinary,
                Normalization::new(&[0.4377, 0.4438, 0.4728], &[0.1980, 0.2010, 0.1970]),
                (32, 2, false),
                ("SVHNCapsuleNet", 3, 32),
            ),
            entry(
                DatasetKind::Cifar10,
                SourceFormat::Cifar10Binary,
                Normalization::new(&[0.4914, 0.4822, 0.4465], &[0.2470, 0.2435, 0.2616]),
                (32, 2, true),
                ("CIFAR10CapsuleNet", 3, 32),
            ),
            entry(
                DatasetKind::Cifar100,
                SourceFormat::Cifar100Binary,
                Normalization::new(&[0.5071, 0.4865, 0.4409], &[0.2673, 0.2564, 0.2762]),
                (32, 2, true),
                ("CIFAR100CapsuleNet", 3, 32),
            ),
            entry(
                DatasetKind::Stl10,
                SourceFormat::Stl10Binary,
                Normalization::new(&[0.4467, 0.4398, 0.4066], &[0.2603, 0.2566, 0.2713]),
                (96, 6, true),
                ("STL10CapsuleNet", 3, 96),
            ),
        ];

        Self {
            entries: entries.into_iter().map(|e| (e.kind, e)).collect(),
        }
    }

    pub fn get(&self, kind: DatasetKind) -> Option<&DatasetEntry> {
        self.entries.get(&kind)
    }

    /// Look up a dataset by name.
    pub fn by_name(&self, name: &str) -> Result<&DatasetEntry, TrainError> {
        let kind: DatasetKind = name.parse()?;
        self.get(kind)
            .ok_or_else(|| TrainError::UnknownDataset(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry(
    kind: DatasetKind,
    source: SourceFormat,
    normalization: Normalization,
    (crop_size, padding, horizontal_flip): (usize, usize, bool),
    (name, in_channels, image_size): (&'static str, usize, usize),
) -> DatasetEntry {
    let class_names = kind.class_names();
    DatasetEntry {
        kind,
        source,
        normalization,
        augment: AugmentSpec {
            crop_size,
            padding,
            horizontal_flip,
        },
        model: ModelSpec {
            name,
            in_channels,
            image_size,
            num_classes: class_names.len(),
        },
        class_names,
    }
}
