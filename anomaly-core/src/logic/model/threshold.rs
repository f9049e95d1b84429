//! Static Threshold Configuration
//!
//! Turns the training reconstruction errors into a single cut-off.
//! Default: the largest training MAE, so every training window counts as normal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::logic::error::{Error, Result};
use crate::logic::features::mean_std;

/// How the threshold is derived from the training errors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ThresholdStrategy {
    /// Maximum training error
    Max,
    /// p-th percentile (0-100, linear interpolation)
    Percentile(f32),
    /// mean + k * std
    MeanStd(f32),
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        ThresholdStrategy::Max
    }
}

impl fmt::Display for ThresholdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdStrategy::Max => write!(f, "max"),
            ThresholdStrategy::Percentile(p) => write!(f, "p{}", p),
            ThresholdStrategy::MeanStd(k) => write!(f, "meanstd:{}", k),
        }
    }
}

/// Accepts `max`, `p99` / `p99.5`, `meanstd:3`
impl FromStr for ThresholdStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        let invalid = || Error::Config(format!("unknown threshold strategy '{}'", s));

        if s == "max" {
            return Ok(ThresholdStrategy::Max);
        }
        if let Some(p) = s.strip_prefix('p') {
            let p: f32 = p.parse().map_err(|_| invalid())?;
            if !(0.0..=100.0).contains(&p) {
                return Err(Error::Config(format!("percentile must be in [0, 100], got {}", p)));
            }
            return Ok(ThresholdStrategy::Percentile(p));
        }
        if let Some(k) = s.strip_prefix("meanstd:") {
            let k: f32 = k.parse().map_err(|_| invalid())?;
            if !k.is_finite() {
                return Err(Error::Config(format!("meanstd factor must be finite, got {}", k)));
            }
            return Ok(ThresholdStrategy::MeanStd(k));
        }
        Err(invalid())
    }
}

/// Threshold Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub strategy: ThresholdStrategy,

    /// Sensitivity multiplier, the derived value is divided by it (> 1 flags more)
    pub sensitivity: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            strategy: ThresholdStrategy::Max,
            sensitivity: 1.0,
        }
    }
}

impl ThresholdConfig {
    /// Derive the threshold from training errors
    pub fn compute(&self, errors: &[f32]) -> Result<ThresholdStats> {
        if errors.is_empty() {
            return Err(Error::InsufficientData(
                "no reconstruction errors to derive a threshold from".to_string(),
            ));
        }
        if !(self.sensitivity > 0.0 && self.sensitivity.is_finite()) {
            return Err(Error::Config(format!(
                "sensitivity must be > 0, got {}",
                self.sensitivity
            )));
        }

        let (mean, std) = mean_std(errors);
        let max = errors.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let base = match self.strategy {
            ThresholdStrategy::Max => max,
            ThresholdStrategy::Percentile(p) => percentile(errors, p),
            ThresholdStrategy::MeanStd(k) => mean + k * std,
        };

        let threshold = base / self.sensitivity;
        if !threshold.is_finite() {
            return Err(Error::Config(format!(
                "threshold is not finite ({}, sensitivity {})",
                self.strategy, self.sensitivity
            )));
        }

        Ok(ThresholdStats {
            threshold,
            strategy: self.strategy,
            mean,
            std,
            max,
            count: errors.len(),
        })
    }
}

/// Linear-interpolated percentile, `p` in [0, 100]
pub fn percentile(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Threshold statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStats {
    pub threshold: f32,
    pub strategy: ThresholdStrategy,
    pub mean: f32,
    pub std: f32,
    pub max: f32,
    pub count: usize,
}

impl ThresholdStats {
    /// Check if an error exceeds the threshold
    pub fn is_anomaly(&self, error: f32) -> bool {
        error > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_threshold() {
        let stats = ThresholdConfig::default()
            .compute(&[0.1, 0.4, 0.2])
            .unwrap();
        assert_eq!(stats.threshold, 0.4);
        assert_eq!(stats.max, 0.4);
        assert_eq!(stats.count, 3);

        // Equal to the threshold is still normal
        assert!(!stats.is_anomaly(0.4));
        assert!(stats.is_anomaly(0.41));
    }

    #[test]
    fn test_percentile() {
        let values: Vec<f32> = (0..=100).map(|v| v as f32).collect();
        assert_eq!(percentile(&values, 50.0), 50.0);
        assert!((percentile(&values, 99.0) - 99.0).abs() < 1e-3);
        assert_eq!(percentile(&[1.0, 2.0], 50.0), 1.5);
        assert_eq!(percentile(&[7.0], 90.0), 7.0);
    }

    #[test]
    fn test_mean_std_strategy() {
        let config = ThresholdConfig {
            strategy: ThresholdStrategy::MeanStd(2.0),
            ..Default::default()
        };
        let stats = config.compute(&[1.0, 3.0]).unwrap();
        // mean 2, sample std sqrt(2)
        assert!((stats.threshold - (2.0 + 2.0 * 2.0f32.sqrt())).abs() < 1e-5);
    }

    #[test]
    fn test_sensitivity_lowers_threshold() {
        let config = ThresholdConfig {
            strategy: ThresholdStrategy::Max,
            sensitivity: 2.0,
        };
        let stats = config.compute(&[0.2, 0.8]).unwrap();
        assert!((stats.threshold - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_non_finite_settings() {
        for sensitivity in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let config = ThresholdConfig {
                strategy: ThresholdStrategy::Max,
                sensitivity,
            };
            assert!(matches!(config.compute(&[0.2, 0.8]), Err(Error::Config(_))));
        }

        let config = ThresholdConfig {
            strategy: ThresholdStrategy::MeanStd(f32::NAN),
            ..Default::default()
        };
        assert!(matches!(config.compute(&[0.2, 0.8]), Err(Error::Config(_))));

        assert!("meanstd:nan".parse::<ThresholdStrategy>().is_err());
        assert!("meanstd:inf".parse::<ThresholdStrategy>().is_err());
        assert!("pnan".parse::<ThresholdStrategy>().is_err());
    }

    #[test]
    fn test_empty_errors() {
        assert!(matches!(
            ThresholdConfig::default().compute(&[]),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("max".parse::<ThresholdStrategy>().unwrap(), ThresholdStrategy::Max);
        assert_eq!(
            "P99.5".parse::<ThresholdStrategy>().unwrap(),
            ThresholdStrategy::Percentile(99.5)
        );
        assert_eq!(
            "meanstd:3".parse::<ThresholdStrategy>().unwrap(),
            ThresholdStrategy::MeanStd(3.0)
        );
        assert!("p120".parse::<ThresholdStrategy>().is_err());
        assert!("median".parse::<ThresholdStrategy>().is_err());

        let round = ThresholdStrategy::Percentile(95.0).to_string();
        assert_eq!(round.parse::<ThresholdStrategy>().unwrap(), ThresholdStrategy::Percentile(95.0));
    }
}
