//! Time-bounded sliding window of raw samples.

use std::collections::VecDeque;

use crate::types::Sample;

/// Holds the samples of the most recent `window_ms`, oldest first.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    window_ms: i64,
    samples: VecDeque<Sample>,
}

impl SampleBuffer {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            // 2s at the nominal 50ms rate
            samples: VecDeque::with_capacity(48),
        }
    }

    /// Appends `sample` and drops everything older than `sample.timestamp - window_ms`.
    ///
    /// Callers must keep timestamps non-decreasing.
    pub fn push(&mut self, sample: Sample) {
        let cutoff = sample.timestamp.saturating_sub(self.window_ms);
        self.samples.push_back(sample);

        while let Some(oldest) = self.samples.front() {
            if oldest.timestamp < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn latest_timestamp(&self) -> Option<i64> {
        self.samples.back().map(|s| s.timestamp)
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_at(timestamp: i64) -> Sample {
        Sample::new(0.0, 0.0, 9.81, timestamp)
    }

    #[test]
    fn test_prunes_by_age() {
        let mut buffer = SampleBuffer::new(2000);
        for i in 0..=60 {
            buffer.push(sample_at(i * 50));
        }

        let now = 3000;
        assert_eq!(buffer.latest_timestamp(), Some(now));
        assert!(buffer.iter().all(|s| now - s.timestamp <= 2000));
        // 1000..=3000 inclusive
        assert_eq!(buffer.len(), 41);
    }

    #[test]
    fn test_keeps_sample_exactly_at_window_edge() {
        let mut buffer = SampleBuffer::new(2000);
        buffer.push(sample_at(1000));
        buffer.push(sample_at(3000));
        assert_eq!(buffer.len(), 2);

        buffer.push(sample_at(3001));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.iter().next().map(|s| s.timestamp), Some(3000));
    }

    #[test]
    fn test_irregular_sampling_changes_length() {
        let mut buffer = SampleBuffer::new(2000);
        let mut t = 0;
        for i in 0..100 {
            t += if i % 2 == 0 { 40 } else { 70 };
            buffer.push(sample_at(t));
        }
        assert!(buffer.len() >= 36 && buffer.len() <= 38, "len {}", buffer.len());
    }

    #[test]
    fn test_clear() {
        let mut buffer = SampleBuffer::new(2000);
        buffer.push(sample_at(10));
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.latest_timestamp(), None);
    }

    #[test]
    fn test_magnitude_is_precomputed() {
        let sample = Sample::new(3.0, 4.0, 12.0, 0);
        assert!((sample.magnitude - 13.0).abs() < 1e-12);
    }
}
