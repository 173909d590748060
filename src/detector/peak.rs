//! Five-point local maximum detector over the magnitude stream.

use std::collections::VecDeque;

use crate::config::PeakConfig;

const WINDOW: usize = 5;
const CENTER: usize = WINDOW / 2;

/// Remembers the last five magnitudes and reports when the middle one is a
/// strict local maximum above the configured threshold.
///
/// Recording and evaluation are split so the history stays current while
/// evaluation is gated by the caller.
#[derive(Debug, Clone)]
pub struct PeakDetector {
    threshold: f64,
    recent: VecDeque<f64>,
}

impl PeakDetector {
    pub fn new(config: &PeakConfig) -> Self {
        Self {
            threshold: config.threshold,
            recent: VecDeque::with_capacity(WINDOW),
        }
    }

    pub fn record(&mut self, magnitude: f64) {
        if self.recent.len() == WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(magnitude);
    }

    /// Magnitude of the middle value when it is a peak candidate.
    pub fn peak(&self) -> Option<f64> {
        if self.recent.len() < WINDOW {
            return None;
        }

        let center = self.recent[CENTER];
        let dominates = self
            .recent
            .iter()
            .enumerate()
            .all(|(i, &m)| i == CENTER || center > m);

        (dominates && center > self.threshold).then_some(center)
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }
}
