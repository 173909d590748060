//! Lenient detector: any sharp change in magnitude, rate limited.
//!
//! Useful for devices whose mounting defeats the walking classifier.

use crate::config::SimpleModeConfig;
use crate::types::{Sample, StepCandidate};

#[derive(Debug, Clone)]
pub struct SimpleDetector {
    config: SimpleModeConfig,
    last_magnitude: Option<f64>,
}

impl SimpleDetector {
    pub fn new(config: SimpleModeConfig) -> Self {
        Self {
            config,
            last_magnitude: None,
        }
    }

    pub fn detect(&mut self, sample: &Sample, last_step: Option<i64>) -> Option<StepCandidate> {
        let previous = self.last_magnitude.replace(sample.magnitude)?;

        let jump = (sample.magnitude - previous).abs();
        let rested = last_step
            .map(|t| sample.timestamp.saturating_sub(t) > self.config.min_step_interval_ms)
            .unwrap_or(true);

        (jump > self.config.min_magnitude_change && rested)
            .then(|| StepCandidate::new(sample.magnitude, sample.timestamp))
    }

    pub fn set_min_step_interval(&mut self, interval_ms: i64) {
        self.config.min_step_interval_ms = interval_ms;
    }

    pub fn reset(&mut self) {
        self.last_magnitude = None;
    }
}
