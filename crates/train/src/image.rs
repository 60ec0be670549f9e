use ::image::{GrayImage, Pixel, Rgb, RgbImage};

use crate::error::TrainError;

/// An 8-bit grayscale or RGB sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Image {
    Gray(GrayImage),
    Rgb(RgbImage),
}

fn dimensions(height: usize, width: usize) -> Result<(u32, u32), TrainError> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(TrainError::Shape(format!("{height}x{width} image is too large"))),
    }
}

fn length_error(
    layout: &str,
    channels: usize,
    height: usize,
    width: usize,
    got: usize,
) -> TrainError {
    TrainError::Shape(format!(
        "{layout}{channels}x{height}x{width} image needs {} bytes, got {got}",
        channels * height * width
    ))
}

impl Image {
    /// Build from interleaved (HWC) bytes. Only 1 and 3 channels exist.
    pub fn new(
        channels: usize,
        height: usize,
        width: usize,
        data: Vec<u8>,
    ) -> Result<Self, TrainError> {
        let (w, h) = dimensions(height, width)?;
        let got = data.len();
        if got != channels * height * width {
            return Err(length_error("", channels, height, width, got));
        }
        let image = match channels {
            1 => GrayImage::from_raw(w, h, data).map(Image::Gray),
            3 => RgbImage::from_raw(w, h, data).map(Image::Rgb),
            _ => return Err(TrainError::Shape(format!("unsupported channel count {channels}"))),
        };
        image.ok_or_else(|| length_error("", channels, height, width, got))
    }

    /// Build from planar channel data (CHW), as stored by the CIFAR and
    /// SVHN binaries.
    pub fn from_planar(
        channels: usize,
        height: usize,
        width: usize,
        planar: &[u8],
    ) -> Result<Self, TrainError> {
        let plane = height * width;
        if planar.len() != channels * plane {
            return Err(length_error("planar ", channels, height, width, planar.len()));
        }
        match channels {
            1 => Self::new(1, height, width, planar.to_vec()),
            3 => {
                let (w, h) = dimensions(height, width)?;
                let (r, rest) = planar.split_at(plane);
                let (g, b) = rest.split_at(plane);
                Ok(Image::Rgb(RgbImage::from_fn(w, h, |x, y| {
                    let i = y as usize * width + x as usize;
                    Rgb([r[i], g[i], b[i]])
                })))
            }
            _ => Err(TrainError::Shape(format!("unsupported channel count {channels}"))),
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            Image::Gray(_) => 1,
            Image::Rgb(_) => 3,
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Image::Gray(img) => img.height() as usize,
            Image::Rgb(img) => img.height() as usize,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Image::Gray(img) => img.width() as usize,
            Image::Rgb(img) => img.width() as usize,
        }
    }

    /// Interleaved (HWC) bytes.
    pub fn as_raw(&self) -> &[u8] {
        match self {
            Image::Gray(img) => img.as_raw(),
            Image::Rgb(img) => img.as_raw(),
        }
    }

    #[inline]
    pub fn pixel(&self, y: usize, x: usize, c: usize) -> u8 {
        let (x, y) = (x as u32, y as u32);
        match self {
            Image::Gray(img) => img.get_pixel(x, y).channels()[c],
            Image::Rgb(img) => img.get_pixel(x, y).channels()[c],
        }
    }
}

/// A float tensor laid out channel-first (CHW).
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: [usize; 3],
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn channels(&self) -> usize {
        self.shape[0]
    }

    /// Values of channel `c`.
    pub fn plane(&self, c: usize) -> &[f32] {
        let len = self.shape[1] * self.shape[2];
        &self.data[c * len..(c + 1) * len]
    }
}
