use serde::Serialize;

use crate::error::TrainError;
use crate::sources::Sample;

/// Per-channel mean and population standard deviation of `[0, 1]` pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStats {
    pub samples: usize,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

/// Compute normalization statistics over a training split.
///
/// All samples must share a channel count.
pub fn channel_stats(samples: &[Sample]) -> Result<ChannelStats, TrainError> {
    let Some(first) = samples.first() else {
        return Err(TrainError::Shape("no samples".to_string()));
    };
    let channels = first.image.channels();

    let mut count = vec![0u64; channels];
    let mut sum = vec![0f64; channels];
    let mut sum_sq = vec![0f64; channels];

    for sample in samples {
        let image = &sample.image;
        if image.channels() != channels {
            return Err(TrainError::Shape(format!(
                "mixed channel counts: {channels} and {}",
                image.channels()
            )));
        }
        for px in image.as_raw().chunks_exact(channels) {
            for (c, &v) in px.iter().enumerate() {
                let v = f64::from(v) / 255.0;
                count[c] += 1;
                sum[c] += v;
                sum_sq[c] += v * v;
            }
        }
    }

    let mean: Vec<f64> = sum
        .iter()
        .zip(&count)
        .map(|(s, &n)| s / n.max(1) as f64)
        .collect();
    let std = sum_sq
        .iter()
        .zip(&count)
        .zip(&mean)
        .map(|((sq, &n), m)| (sq / n.max(1) as f64 - m * m).max(0.0).sqrt())
        .collect();

    Ok(ChannelStats {
        samples: samples.len(),
        mean,
        std,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;

    fn sample(channels: usize, data: Vec<u8>) -> Sample {
        let pixels = data.len() / channels;
        Sample {
            image: Image::new(channels, 1, pixels, data).expect("image"),
            label: 0,
        }
    }

    #[test]
    fn population_statistics_per_channel() {
        // Channel 0: {0, 255} -> mean 0.5, std 0.5. Channels 1 and 2: constant 51.
        let samples = vec![sample(3, vec![0, 51, 51]), sample(3, vec![255, 51, 51])];
        let stats = channel_stats(&samples).expect("stats");
        assert_eq!(stats.samples, 2);
        assert!((stats.mean[0] - 0.5).abs() < 1e-12);
        assert!((stats.std[0] - 0.5).abs() < 1e-12);
        assert!((stats.mean[1] - 0.2).abs() < 1e-12);
        assert!(stats.std[1].abs() < 1e-6);
    }

    #[test]
    fn empty_split_is_rejected() {
        assert!(matches!(channel_stats(&[]), Err(TrainError::Shape(_))));
    }

    #[test]
    fn mixed_channels_are_rejected() {
        let samples = vec![sample(1, vec![0]), sample(3, vec![0, 0, 0])];
        assert!(matches!(channel_stats(&samples), Err(TrainError::Shape(_))));
    }
}
