//! Sequence Buffer - streaming input for the detector
//!
//! Keeps the most recent `T` normalized values; once full, every new value
//! yields a window ending at that value.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::inference::Detector;
use crate::logic::error::Result;

// ============================================================================
// BUFFER
// ============================================================================

#[derive(Debug, Clone)]
pub struct SequenceBuffer {
    values: VecDeque<f32>,
    capacity: usize,
}

impl SequenceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a value, dropping the oldest once full
    pub fn push(&mut self, value: f32) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn is_ready(&self) -> bool {
        self.capacity > 0 && self.values.len() >= self.capacity
    }

    /// Current window, oldest first
    pub fn window(&self) -> Option<Vec<f32>> {
        if !self.is_ready() {
            return None;
        }
        Some(self.values.iter().copied().collect())
    }

    pub fn status(&self) -> BufferStatus {
        BufferStatus {
            current_size: self.values.len(),
            required_size: self.capacity,
            is_ready: self.is_ready(),
            fill_percent: if self.capacity > 0 {
                (self.values.len() as f32 / self.capacity as f32 * 100.0).min(100.0)
            } else {
                0.0
            },
        }
    }
}

/// Buffer status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferStatus {
    pub current_size: usize,
    pub required_size: usize,
    pub is_ready: bool,
    pub fill_percent: f32,
}

// ============================================================================
// STREAMING DETECTOR
// ============================================================================

/// Score of the window ending at the latest pushed value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamScore {
    /// Number of values pushed so far, minus one
    pub index: usize,
    pub mae: f32,
    /// mae / threshold, > 1 means anomalous
    pub score: f32,
    pub is_anomaly: bool,
}

pub struct StreamingDetector<'a> {
    detector: &'a Detector,
    buffer: SequenceBuffer,
    pushed: usize,
}

impl<'a> StreamingDetector<'a> {
    pub fn new(detector: &'a Detector) -> Self {
        Self {
            buffer: SequenceBuffer::new(detector.time_steps()),
            detector,
            pushed: 0,
        }
    }

    /// Push a raw value and score the window if the buffer is full
    pub fn push(&mut self, value: f32) -> Result<Option<StreamScore>> {
        let normalized = self.detector.metadata().normalizer.normalize(value);
        self.buffer.push(normalized);
        let index = self.pushed;
        self.pushed += 1;

        let Some(window) = self.buffer.window() else {
            return Ok(None);
        };

        let mae = self.detector.score_window(&window)?;
        let threshold = &self.detector.metadata().threshold;
        Ok(Some(StreamScore {
            index,
            mae,
            score: if threshold.threshold > 0.0 {
                mae / threshold.threshold
            } else {
                f32::INFINITY
            },
            is_anomaly: threshold.is_anomaly(mae),
        }))
    }

    pub fn buffer_status(&self) -> BufferStatus {
        self.buffer.status()
    }
}
