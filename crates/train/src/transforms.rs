//! Sample preprocessing.
//!
//! A pipeline is a sequence of random image operations followed by
//! conversion to a `[0, 1]` CHW tensor and, optionally, per-channel
//! normalization.

use ::image::{imageops, ImageBuffer, Pixel};
use rand::Rng;

use crate::image::{Image, Tensor};
use crate::registry::{DatasetEntry, Normalization};

/// Which split an iterator serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Test,
}

impl Mode {
    pub fn is_train(&self) -> bool {
        matches!(self, Mode::Train)
    }
}

/// Random operations applied to the 8-bit image before tensor conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageOp {
    /// Zero-pad each border by `padding`, then crop a random `size`×`size`
    /// window.
    RandomCrop { size: usize, padding: usize },
    /// Mirror left-right with probability `p`.
    RandomHorizontalFlip { p: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformPipeline {
    ops: Vec<ImageOp>,
    normalize: Option<Normalization>,
}

impl TransformPipeline {
    /// Tensor conversion only.
    pub fn to_tensor_only() -> Self {
        Self {
            ops: Vec::new(),
            normalize: None,
        }
    }

    pub fn ops(&self) -> &[ImageOp] {
        &self.ops
    }

    pub fn normalization(&self) -> Option<&Normalization> {
        self.normalize.as_ref()
    }

    pub fn apply<R: Rng + ?Sized>(&self, image: &Image, rng: &mut R) -> Tensor {
        let mut current: Option<Image> = None;
        for op in &self.ops {
            let src = current.as_ref().unwrap_or(image);
            let next = match *op {
                ImageOp::RandomCrop { size, padding } => random_crop(src, size, padding, rng),
                ImageOp::RandomHorizontalFlip { p } => {
                    if rng.random_bool(p) {
                        flip_horizontal(src)
                    } else {
                        continue;
                    }
                }
            };
            current = Some(next);
        }

        let mut tensor = to_tensor(current.as_ref().unwrap_or(image));
        if let Some(norm) = &self.normalize {
            normalize(&mut tensor, norm);
        }
        tensor
    }
}

/// Assemble the preprocessing for `entry`.
///
/// With augmentation on, training samples are randomly cropped (and
/// flipped where the dataset allows it) and every split is normalized.
/// With augmentation off, samples are only converted to tensors; no
/// normalization is applied in that case.
pub fn build_pipeline(entry: &DatasetEntry, mode: Mode, augment: bool) -> TransformPipeline {
    if !augment {
        return TransformPipeline::to_tensor_only();
    }

    let mut ops = Vec::new();
    if mode.is_train() {
        ops.push(ImageOp::RandomCrop {
            size: entry.augment.crop_size,
            padding: entry.augment.padding,
        });
        if entry.augment.horizontal_flip {
            ops.push(ImageOp::RandomHorizontalFlip { p: 0.5 });
        }
    }

    TransformPipeline {
        ops,
        normalize: Some(entry.normalization.clone()),
    }
}

fn random_crop<R: Rng + ?Sized>(image: &Image, size: usize, padding: usize, rng: &mut R) -> Image {
    match image {
        Image::Gray(img) => Image::Gray(pad_and_crop(img, size, padding, rng)),
        Image::Rgb(img) => Image::Rgb(pad_and_crop(img, size, padding, rng)),
    }
}

fn pad_and_crop<P, R>(
    image: &ImageBuffer<P, Vec<u8>>,
    size: usize,
    padding: usize,
    rng: &mut R,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
    R: Rng + ?Sized,
{
    let pad = u32::try_from(padding).unwrap_or(u32::MAX / 4);
    let size = u32::try_from(size).unwrap_or(u32::MAX);

    let (width, height) = image.dimensions();
    let mut padded: ImageBuffer<P, Vec<u8>> = ImageBuffer::new(width + 2 * pad, height + 2 * pad);
    imageops::replace(&mut padded, image, i64::from(pad), i64::from(pad));

    let out_w = size.min(padded.width());
    let out_h = size.min(padded.height());
    let left = rng.random_range(0..=padded.width() - out_w);
    let top = rng.random_range(0..=padded.height() - out_h);
    imageops::crop_imm(&padded, left, top, out_w, out_h).to_image()
}

fn flip_horizontal(image: &Image) -> Image {
    match image {
        Image::Gray(img) => Image::Gray(imageops::flip_horizontal(img)),
        Image::Rgb(img) => Image::Rgb(imageops::flip_horizontal(img)),
    }
}

fn to_tensor(image: &Image) -> Tensor {
    match image {
        Image::Gray(img) => planes(img),
        Image::Rgb(img) => planes(img),
    }
}

fn planes<P: Pixel<Subpixel = u8>>(image: &ImageBuffer<P, Vec<u8>>) -> Tensor {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let channels = usize::from(P::CHANNEL_COUNT);
    let plane = height * width;
    let mut data = vec![0f32; channels * plane];
    for (i, px) in image.pixels().enumerate() {
        for (c, &v) in px.channels().iter().enumerate() {
            data[c * plane + i] = f32::from(v) / 255.0;
        }
    }
    Tensor {
        shape: [channels, height, width],
        data,
    }
}

fn normalize(tensor: &mut Tensor, norm: &Normalization) {
    let plane = tensor.shape[1] * tensor.shape[2];
    for c in 0..tensor.channels() {
        let mean = norm.mean.get(c).copied().unwrap_or(0.0);
        let std = norm.std.get(c).copied().unwrap_or(1.0);
        for v in &mut tensor.data[c * plane..(c + 1) * plane] {
            *v = (*v - mean) / std;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::dataset::DatasetKind;
    use crate::registry::DatasetRegistry;

    fn gray(height: usize, width: usize) -> Image {
        let data = (0..height * width).map(|v| (v % 256) as u8).collect();
        Image::new(1, height, width, data).expect("image")
    }

    #[test]
    fn augmented_training_crops_flips_and_normalizes() {
        let registry = DatasetRegistry::standard();
        let entry = registry.get(DatasetKind::Cifar10).expect("cifar10");
        let pipeline = build_pipeline(entry, Mode::Train, true);
        assert_eq!(
            pipeline.ops(),
            &[
                ImageOp::RandomCrop { size: 32, padding: 2 },
                ImageOp::RandomHorizontalFlip { p: 0.5 },
            ]
        );
        assert!(pipeline.normalization().is_some());
    }

    #[test]
    fn mnist_training_has_no_flip() {
        let registry = DatasetRegistry::standard();
        let entry = registry.get(DatasetKind::Mnist).expect("mnist");
        let pipeline = build_pipeline(entry, Mode::Train, true);
        assert_eq!(pipeline.ops(), &[ImageOp::RandomCrop { size: 28, padding: 2 }]);
    }

    #[test]
    fn augmented_test_only_normalizes() {
        let registry = DatasetRegistry::standard();
        let entry = registry.get(DatasetKind::Stl10).expect("stl10");
        let pipeline = build_pipeline(entry, Mode::Test, true);
        assert!(pipeline.ops().is_empty());
        assert_eq!(pipeline.normalization(), Some(&entry.normalization));
    }

    #[test]
    fn no_augmentation_means_no_normalization() {
        let registry = DatasetRegistry::standard();
        let entry = registry.get(DatasetKind::Mnist).expect("mnist");
        let pipeline = build_pipeline(entry, Mode::Train, false);
        assert_eq!(pipeline, TransformPipeline::to_tensor_only());

        let img = Image::new(1, 1, 2, vec![0, 255]).expect("image");
        let tensor = pipeline.apply(&img, &mut StdRng::seed_from_u64(0));
        assert_eq!(tensor.data, vec![0.0, 1.0]);
    }

    #[test]
    fn normalization_uses_channel_statistics() {
        let registry = DatasetRegistry::standard();
        let entry = registry.get(DatasetKind::Mnist).expect("mnist");
        let pipeline = build_pipeline(entry, Mode::Test, true);
        let img = Image::new(1, 1, 1, vec![255]).expect("image");
        let tensor = pipeline.apply(&img, &mut StdRng::seed_from_u64(0));
        let expected = (1.0 - 0.1307) / 0.3081;
        assert!((tensor.data[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn crop_keeps_size_and_pads_with_zeros() {
        let img = Image::new(1, 4, 4, vec![255; 16]).expect("image");
        let mut rng = StdRng::seed_from_u64(7);
        let mut saw_padding = false;
        for _ in 0..50 {
            let out = random_crop(&img, 4, 2, &mut rng);
            assert_eq!((out.height(), out.width()), (4, 4));
            saw_padding |= out.as_raw().contains(&0);
        }
        assert!(saw_padding);
    }

    #[test]
    fn crop_without_padding_is_identity() {
        let img = gray(3, 3);
        let out = random_crop(&img, 3, 0, &mut StdRng::seed_from_u64(1));
        assert_eq!(out, img);
    }

    #[test]
    fn padded_crop_shifts_content() {
        // A 1x1 white pixel padded by 1 and cropped to 1x1 lands on one of
        // nine positions, only the centre of which is white.
        let img = Image::new(3, 1, 1, vec![255, 255, 255]).expect("image");
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 2];
        for _ in 0..100 {
            let out = random_crop(&img, 1, 1, &mut rng);
            assert_eq!(out.channels(), 3);
            seen[usize::from(out.as_raw()[0] == 255)] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn flip_mirrors_rows() {
        let img = Image::new(1, 1, 3, vec![1, 2, 3]).expect("image");
        assert_eq!(flip_horizontal(&img).as_raw(), &[3, 2, 1]);
    }

    #[test]
    fn tensor_is_channel_first() {
        let img = Image::from_planar(3, 1, 1, &[0, 51, 255]).expect("image");
        let tensor = to_tensor(&img);
        assert_eq!(tensor.shape, [3, 1, 1]);
        assert_eq!(tensor.plane(1), &[0.2]);
        assert_eq!(tensor.data, vec![0.0, 0.2, 1.0]);
    }
}
