//! Sliding windows
//!
//! Window `i` covers points `i .. i + T`, so a series of `n` points yields
//! `n - T + 1` windows shaped `(windows, T, 1)`.

use std::ops::Range;

use ndarray::Array3;

use crate::logic::error::{Error, Result};

/// Number of stride-1 windows of length `time_steps` in `len` points
pub fn window_count(len: usize, time_steps: usize) -> usize {
    if time_steps == 0 || len < time_steps {
        0
    } else {
        len - time_steps + 1
    }
}

/// Build the `(windows, time_steps, 1)` tensor
pub fn create_sequences(values: &[f32], time_steps: usize) -> Result<Array3<f32>> {
    if time_steps == 0 {
        return Err(Error::Config("time_steps must be > 0".to_string()));
    }
    if values.len() < time_steps {
        return Err(Error::InsufficientData(format!(
            "series has {} points, a window needs {}",
            values.len(),
            time_steps
        )));
    }

    let count = window_count(values.len(), time_steps);
    let mut data = Vec::with_capacity(count * time_steps);
    for window in values.windows(time_steps) {
        data.extend_from_slice(window);
    }

    Ok(Array3::from_shape_vec((count, time_steps, 1), data)?)
}

/// Indices of the windows that contain point `point`
pub fn covering_windows(point: usize, len: usize, time_steps: usize) -> Range<usize> {
    let count = window_count(len, time_steps);
    if count == 0 || point >= len {
        return 0..0;
    }
    let first = (point + 1).saturating_sub(time_steps);
    let last = point.min(count - 1);
    first..last + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sequences_shape_and_content() {
        let values: Vec<f32> = (0..10).map(|v| v as f32).collect();
        let windows = create_sequences(&values, 4).unwrap();

        assert_eq!(windows.shape(), &[7, 4, 1]);
        assert_eq!(windows[[0, 0, 0]], 0.0);
        assert_eq!(windows[[0, 3, 0]], 3.0);
        assert_eq!(windows[[6, 0, 0]], 6.0);
        assert_eq!(windows[[6, 3, 0]], 9.0);
    }

    #[test]
    fn test_exact_length_gives_one_window() {
        let windows = create_sequences(&[1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert_eq!(windows.shape(), &[1, 4, 1]);
    }

    #[test]
    fn test_too_short_series() {
        assert!(matches!(
            create_sequences(&[1.0, 2.0], 4),
            Err(Error::InsufficientData(_))
        ));
        assert!(matches!(create_sequences(&[1.0], 0), Err(Error::Config(_))));
    }

    #[test]
    fn test_nab_sizes() {
        // 4032 points (14 days at 5 min) with a one-day window
        assert_eq!(window_count(4032, 288), 3745);
        assert_eq!(window_count(10, 0), 0);
    }

    #[test]
    fn test_covering_windows() {
        // 10 points, T = 4 -> windows 0..=6
        assert_eq!(covering_windows(0, 10, 4), 0..1);
        assert_eq!(covering_windows(3, 10, 4), 0..4);
        assert_eq!(covering_windows(5, 10, 4), 2..6);
        assert_eq!(covering_windows(9, 10, 4), 6..7);
        assert_eq!(covering_windows(10, 10, 4), 0..0);
    }
}
