//! Features Module - turning a raw series into model input
//!
//! - `normalize` - z-score scaling with statistics from the training series
//! - `windows` - fixed-length, stride-1 sliding windows

pub mod normalize;
pub mod windows;

pub use normalize::Normalizer;
pub use windows::{covering_windows, create_sequences};

/// Mean and sample standard deviation (n - 1 denominator)
pub fn mean_std(values: &[f32]) -> (f32, f32) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }

    // Accumulate in f64, the series can hold thousands of points
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    if n < 2 {
        return (mean as f32, 0.0);
    }

    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;

    (mean as f32, variance.sqrt() as f32)
}
