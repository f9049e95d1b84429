//! Z-score normalization
//!
//! Fitted once on the training series; the same parameters are stored in the
//! model metadata and reused for every series scored later.

use serde::{Deserialize, Serialize};

use super::mean_std;
use crate::logic::error::{Error, Result};

/// Normalization parameters from training
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub mean: f32,
    pub std: f32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { mean: 0.0, std: 1.0 }
    }
}

impl Normalizer {
    pub fn fit(values: &[f32]) -> Result<Self> {
        if values.len() < 2 {
            return Err(Error::InsufficientData(format!(
                "need at least 2 values to fit a normalizer, got {}",
                values.len()
            )));
        }

        let (mean, mut std) = mean_std(values);
        if std <= f32::EPSILON {
            log::warn!("Training series is constant (std = {}), using std = 1.0", std);
            std = 1.0;
        }

        log::debug!("Normalizer fitted: mean={:.4}, std={:.4}", mean, std);
        Ok(Self { mean, std })
    }

    pub fn normalize(&self, value: f32) -> f32 {
        (value - self.mean) / self.std
    }

    pub fn transform(&self, values: &[f32]) -> Vec<f32> {
        values.iter().map(|&v| self.normalize(v)).collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform_centers_series() {
        let values = [10.0, 12.0, 14.0, 16.0, 18.0];
        let norm = Normalizer::fit(&values).unwrap();
        let scaled = norm.transform(&values);

        let mean: f32 = scaled.iter().sum::<f32>() / scaled.len() as f32;
        assert!(mean.abs() < 1e-5);
        assert!((scaled[4] - scaled[0] - 8.0 / norm.std).abs() < 1e-5);
    }

    #[test]
    fn test_test_series_uses_training_stats() {
        let norm = Normalizer::fit(&[0.0, 2.0]).unwrap();
        // mean 1, sample std sqrt(2)
        let scaled = norm.transform(&[1.0, 1.0 + 2.0f32.sqrt()]);
        assert!(scaled[0].abs() < 1e-6);
        assert!((scaled[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_constant_series() {
        let norm = Normalizer::fit(&[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(norm.std, 1.0);
        assert_eq!(norm.transform(&[5.0]), vec![0.0]);
    }

    #[test]
    fn test_fit_needs_two_values() {
        assert!(matches!(
            Normalizer::fit(&[1.0]),
            Err(Error::InsufficientData(_))
        ));
    }
}
