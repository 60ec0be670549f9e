//! Readers for the on-disk dataset formats.
//!
//! Each dataset lives in `<data_root>/<NAME>/`:
//!
//! | dataset      | files                                                       |
//! |--------------|-------------------------------------------------------------|
//! | MNIST        | `MNIST/raw/{train,t10k}-{images-idx3,labels-idx1}-ubyte`    |
//! | FashionMNIST | same as MNIST under `FashionMNIST/raw/`                     |
//! | CIFAR10      | `cifar-10-batches-bin/{data_batch_1..5,test_batch}.bin`     |
//! | CIFAR100     | `cifar-100-binary/{train,test}.bin`                         |
//! | STL10        | `stl10_binary/{train,test}_{X,y}.bin`                       |
//! | SVHN         | `svhn-binary/{train,test}.bin`                              |

use std::path::{Path, PathBuf};

use crate::error::TrainError;
use crate::image::Image;
use crate::registry::{DatasetEntry, SourceFormat};
use crate::transforms::Mode;

const IDX_IMAGES_MAGIC: u32 = 0x0000_0803;
const IDX_LABELS_MAGIC: u32 = 0x0000_0801;

/// 32×32 RGB planar image after the label byte(s).
const CIFAR_IMAGE_BYTES: usize = 3 * 32 * 32;

const STL10_SIDE: usize = 96;

/// One labeled image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub image: Image,
    pub label: usize,
}

/// Directory holding `entry`'s files under `data_root`.
pub fn dataset_dir(data_root: &Path, entry: &DatasetEntry) -> PathBuf {
    data_root.join(entry.kind.as_str())
}

/// Load the train or test split of `entry` from `data_root`.
pub fn load_split(
    data_root: &Path,
    entry: &DatasetEntry,
    mode: Mode,
) -> Result<Vec<Sample>, TrainError> {
    let dir = dataset_dir(data_root, entry);
    let train = mode.is_train();
    let samples = match entry.source {
        SourceFormat::Idx => {
            let raw = dir.join(entry.kind.as_str()).join("raw");
            let prefix = if train { "train" } else { "t10k" };
            read_idx_pair(
                &raw.join(format!("{prefix}-images-idx3-ubyte")),
                &raw.join(format!("{prefix}-labels-idx1-ubyte")),
            )?
        }
        SourceFormat::Cifar10Binary => {
            let base = dir.join("cifar-10-batches-bin");
            let files: Vec<PathBuf> = if train {
                (1..=5).map(|i| base.join(format!("data_batch_{i}.bin"))).collect()
            } else {
                vec![base.join("test_batch.bin")]
            };
            let mut samples = Vec::new();
            for file in files {
                samples.extend(read_cifar_records(&file, 1, |header| usize::from(header[0]))?);
            }
            samples
        }
        SourceFormat::Cifar100Binary => {
            let file = dir
                .join("cifar-100-binary")
                .join(if train { "train.bin" } else { "test.bin" });
            read_cifar_records(&file, 2, |header| usize::from(header[1]))?
        }
        SourceFormat::SvhnBinary => {
            let file = dir
                .join("svhn-binary")
                .join(if train { "train.bin" } else { "test.bin" });
            read_cifar_records(&file, 1, |header| usize::from(header[0]) % 10)?
        }
        SourceFormat::Stl10Binary => {
            let base = dir.join("stl10_binary");
            let split = if train { "train" } else { "test" };
            read_stl10(
                &base.join(format!("{split}_X.bin")),
                &base.join(format!("{split}_y.bin")),
            )?
        }
    };

    tracing::info!(
        dataset = %entry.kind,
        split = if train { "train" } else { "test" },
        samples = samples.len(),
        "Loaded dataset split",
    );
    Ok(samples)
}

fn read_file(path: &Path) -> Result<Vec<u8>, TrainError> {
    if !path.exists() {
        return Err(TrainError::NotFound(path.to_path_buf()));
    }
    Ok(std::fs::read(path)?)
}

fn malformed(path: &Path, reason: impl Into<String>) -> TrainError {
    TrainError::Malformed {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn be_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let chunk = bytes.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
}

/// Read an IDX image file and its label file.
pub fn read_idx_pair(images: &Path, labels: &Path) -> Result<Vec<Sample>, TrainError> {
    let image_bytes = read_file(images)?;
    let label_bytes = read_file(labels)?;

    if be_u32(&image_bytes, 0) != Some(IDX_IMAGES_MAGIC) {
        return Err(malformed(images, "bad IDX image magic"));
    }
    if be_u32(&label_bytes, 0) != Some(IDX_LABELS_MAGIC) {
        return Err(malformed(labels, "bad IDX label magic"));
    }

    let header = |offset| be_u32(&image_bytes, offset).map(|v| v as usize);
    let (Some(count), Some(height), Some(width)) = (header(4), header(8), header(12)) else {
        return Err(malformed(images, "truncated IDX header"));
    };
    let Some(label_count) = be_u32(&label_bytes, 4).map(|v| v as usize) else {
        return Err(malformed(labels, "truncated IDX header"));
    };
    if label_count != count {
        return Err(malformed(
            labels,
            format!("{label_count} labels for {count} images"),
        ));
    }

    let pixels = &image_bytes[16..];
    let Some(stride) = height.checked_mul(width) else {
        return Err(malformed(images, format!("{height}x{width} images overflow")));
    };
    if stride == 0 {
        return Err(malformed(images, "zero-sized images"));
    }
    let Some(expected) = count.checked_mul(stride) else {
        return Err(malformed(images, format!("{count} images of {height}x{width} overflow")));
    };
    if pixels.len() != expected {
        return Err(malformed(
            images,
            format!("expected {expected} pixel bytes, found {}", pixels.len()),
        ));
    }
    let label_data = &label_bytes[8..];
    if label_data.len() != count {
        return Err(malformed(labels, "label payload length mismatch"));
    }

    pixels
        .chunks_exact(stride)
        .zip(label_data)
        .map(|(chunk, &label)| -> Result<Sample, TrainError> {
            Ok(Sample {
                image: Image::new(1, height, width, chunk.to_vec())?,
                label: usize::from(label),
            })
        })
        .collect()
}

/// Read fixed-size records of `header_len` label bytes followed by a 32×32
/// planar RGB image.
pub fn read_cifar_records<F>(
    path: &Path,
    header_len: usize,
    label: F,
) -> Result<Vec<Sample>, TrainError>
where
    F: Fn(&[u8]) -> usize,
{
    let bytes = read_file(path)?;
    let record = header_len + CIFAR_IMAGE_BYTES;
    if bytes.len() % record != 0 {
        return Err(malformed(
            path,
            format!("{} bytes is not a multiple of the {record}-byte record", bytes.len()),
        ));
    }

    bytes
        .chunks_exact(record)
        .map(|chunk| -> Result<Sample, TrainError> {
            let (header, planar) = chunk.split_at(header_len);
            Ok(Sample {
                image: Image::from_planar(3, 32, 32, planar)?,
                label: label(header),
            })
        })
        .collect()
}

/// Read STL-10 images (column-major planes) and their 1-based labels.
pub fn read_stl10(images: &Path, labels: &Path) -> Result<Vec<Sample>, TrainError> {
    let image_bytes = read_file(images)?;
    let label_bytes = read_file(labels)?;

    let plane = STL10_SIDE * STL10_SIDE;
    let stride = 3 * plane;
    if image_bytes.len() % stride != 0 {
        return Err(malformed(images, "size is not a whole number of 3x96x96 images"));
    }
    let count = image_bytes.len() / stride;
    if label_bytes.len() != count {
        return Err(malformed(
            labels,
            format!("{} labels for {count} images", label_bytes.len()),
        ));
    }

    let mut samples = Vec::with_capacity(count);
    for (chunk, &label) in image_bytes.chunks_exact(stride).zip(&label_bytes) {
        if label == 0 {
            return Err(malformed(labels, "labels are 1-based; found 0"));
        }
        // Stored column-major per channel: transpose into row-major planes.
        let mut planar = vec![0u8; stride];
        for c in 0..3 {
            for x in 0..STL10_SIDE {
                for y in 0..STL10_SIDE {
                    planar[c * plane + y * STL10_SIDE + x] = chunk[c * plane + x * STL10_SIDE + y];
                }
            }
        }
        samples.push(Sample {
            image: Image::from_planar(3, STL10_SIDE, STL10_SIDE, &planar)?,
            label: usize::from(label - 1),
        });
    }
    Ok(samples)
}
