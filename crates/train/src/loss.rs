//! Classification losses over raw logits.
//!
//! Logits are a row-major `[batch, classes]` slice; targets hold one class
//! index per row.

use crate::error::TrainError;

/// How per-sample losses are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reduction {
    #[default]
    Mean,
    Sum,
}

impl Reduction {
    fn reduce(&self, losses: &[f32]) -> f32 {
        let sum: f32 = losses.iter().sum();
        match self {
            Reduction::Mean => sum / losses.len() as f32,
            Reduction::Sum => sum,
        }
    }
}

pub trait ClassificationLoss {
    /// Loss for each row, before reduction.
    fn per_sample(&self, logits: &[f32], targets: &[usize]) -> Result<Vec<f32>, TrainError>;

    fn reduction(&self) -> Reduction;

    fn loss(&self, logits: &[f32], targets: &[usize]) -> Result<f32, TrainError> {
        let losses = self.per_sample(logits, targets)?;
        Ok(self.reduction().reduce(&losses))
    }
}

/// Down-weights well-classified samples: `-(1 - p)^gamma * log p`, where `p`
/// is the softmax probability of the target class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalLoss {
    pub gamma: f32,
    pub reduction: Reduction,
}

impl Default for FocalLoss {
    fn default() -> Self {
        Self {
            gamma: 2.0,
            reduction: Reduction::Mean,
        }
    }
}

impl FocalLoss {
    pub fn new(gamma: f32, reduction: Reduction) -> Self {
        Self { gamma, reduction }
    }
}

impl ClassificationLoss for FocalLoss {
    fn per_sample(&self, logits: &[f32], targets: &[usize]) -> Result<Vec<f32>, TrainError> {
        target_log_probs(logits, targets).map(|log_p| {
            log_p
                .into_iter()
                .map(|lp| -(1.0 - lp.exp()).powf(self.gamma) * lp)
                .collect()
        })
    }

    fn reduction(&self) -> Reduction {
        self.reduction
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossEntropyLoss {
    pub reduction: Reduction,
}

impl ClassificationLoss for CrossEntropyLoss {
    fn per_sample(&self, logits: &[f32], targets: &[usize]) -> Result<Vec<f32>, TrainError> {
        target_log_probs(logits, targets).map(|log_p| log_p.into_iter().map(|lp| -lp).collect())
    }

    fn reduction(&self) -> Reduction {
        self.reduction
    }
}

/// Log-softmax of each row, max-shifted for stability.
pub fn log_softmax(row: &[f32]) -> Vec<f32> {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let log_sum = row.iter().map(|&x| (x - max).exp()).sum::<f32>().ln();
    row.iter().map(|&x| x - max - log_sum).collect()
}

fn target_log_probs(logits: &[f32], targets: &[usize]) -> Result<Vec<f32>, TrainError> {
    if targets.is_empty() {
        return Err(TrainError::Shape("empty batch".to_string()));
    }
    if logits.len() % targets.len() != 0 || logits.is_empty() {
        return Err(TrainError::Shape(format!(
            "{} logits do not split into {} rows",
            logits.len(),
            targets.len()
        )));
    }
    let classes = logits.len() / targets.len();

    logits
        .chunks_exact(classes)
        .zip(targets)
        .map(|(row, &target)| {
            if target >= classes {
                return Err(TrainError::Shape(format!(
                    "target {target} out of range for {classes} classes"
                )));
            }
            Ok(log_softmax(row)[target])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGITS: [f32; 6] = [2.0, 0.5, -1.0, 0.1, 0.2, 3.0];
    const TARGETS: [usize; 2] = [0, 1];

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn gamma_zero_is_cross_entropy() {
        let focal = FocalLoss::new(0.0, Reduction::Mean);
        let ce = CrossEntropyLoss::default();
        let a = focal.loss(&LOGITS, &TARGETS).expect("focal");
        let b = ce.loss(&LOGITS, &TARGETS).expect("ce");
        assert!(close(a, b), "{a} vs {b}");
    }

    #[test]
    fn focal_down_weights_confident_predictions() {
        let focal = FocalLoss::default();
        let ce = CrossEntropyLoss::default();
        let f = focal.per_sample(&LOGITS, &TARGETS).expect("focal");
        let c = ce.per_sample(&LOGITS, &TARGETS).expect("ce");
        for (f, c) in f.iter().zip(&c) {
            assert!(f < c);
        }
    }

    #[test]
    fn sum_is_mean_times_batch() {
        let mean = FocalLoss::new(2.0, Reduction::Mean).loss(&LOGITS, &TARGETS).expect("mean");
        let sum = FocalLoss::new(2.0, Reduction::Sum).loss(&LOGITS, &TARGETS).expect("sum");
        assert!(close(sum, mean * 2.0));
    }

    #[test]
    fn uniform_logits_give_log_classes() {
        let ce = CrossEntropyLoss::default();
        let loss = ce.loss(&[0.0; 4], &[3]).expect("ce");
        assert!(close(loss, 4f32.ln()));
    }

    #[test]
    fn large_logits_stay_finite() {
        let loss = FocalLoss::default().loss(&[1000.0, -1000.0], &[1]).expect("focal");
        assert!(loss.is_finite());
    }

    #[test]
    fn bad_shapes_are_rejected() {
        let ce = CrossEntropyLoss::default();
        assert!(matches!(ce.loss(&[0.0; 5], &[0, 1]), Err(TrainError::Shape(_))));
        assert!(matches!(ce.loss(&[0.0; 4], &[0, 2]), Err(TrainError::Shape(_))));
        assert!(matches!(ce.loss(&[], &[]), Err(TrainError::Shape(_))));
    }
}
