use log::{debug, trace};

use crate::config::{DetectionMode, DetectorConfig};
use crate::types::{DataPoint, Sample, StepCandidate};

use super::buffer::SampleBuffer;
use super::classifier::{WalkingClassifier, WindowAnalysis};
use super::peak::PeakDetector;
use super::simple::SimpleDetector;
use super::validator::{StepValidator, Verdict};

/// A reading the pipeline refused to process.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SampleError {
    #[error("non-finite reading ({x}, {y}, {z})")]
    NonFinite { x: f64, y: f64, z: f64 },
    #[error("timestamp {timestamp} is older than the newest buffered sample {newest}")]
    OutOfOrder { timestamp: i64, newest: i64 },
    #[error("timestamp {0} is before the epoch")]
    NegativeTimestamp(i64),
}

/// Turns a stream of readings into accepted step candidates.
///
/// Per sample: buffer, classify the window, and only while the window looks
/// like walking and the minimum step interval has passed, look for a peak and
/// run it through the validator. Owns no counter; the caller passes the time
/// of the last accepted step in.
#[derive(Debug, Clone)]
pub struct StepDetector {
    mode: DetectionMode,
    buffer: SampleBuffer,
    classifier: WalkingClassifier,
    peak: PeakDetector,
    validator: StepValidator,
    simple: SimpleDetector,
    last_analysis: Option<WindowAnalysis>,
    newest_timestamp: Option<i64>,
}

impl StepDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            mode: config.mode,
            buffer: SampleBuffer::new(config.window_ms),
            classifier: WalkingClassifier::new(config.classifier, config.min_buffer_samples),
            peak: PeakDetector::new(&config.peak),
            validator: StepValidator::new(config.validator),
            simple: SimpleDetector::new(config.simple),
            last_analysis: None,
            newest_timestamp: None,
        }
    }

    /// Processes one reading. `Ok(Some(_))` means a step was accepted.
    pub fn process(
        &mut self,
        point: DataPoint,
        last_step: Option<i64>,
    ) -> Result<Option<StepCandidate>, SampleError> {
        if !point.is_finite() {
            return Err(SampleError::NonFinite {
                x: point.x,
                y: point.y,
                z: point.z,
            });
        }
        if point.timestamp < 0 {
            return Err(SampleError::NegativeTimestamp(point.timestamp));
        }
        if let Some(newest) = self.newest_timestamp {
            if point.timestamp < newest {
                return Err(SampleError::OutOfOrder {
                    timestamp: point.timestamp,
                    newest,
                });
            }
        }
        self.newest_timestamp = Some(point.timestamp);

        let sample = Sample::from(point);
        let accepted = match self.mode {
            DetectionMode::Pattern => self.process_pattern(sample, last_step),
            DetectionMode::Simple => self.simple.detect(&sample, last_step),
        };
        Ok(accepted)
    }

    fn process_pattern(&mut self, sample: Sample, last_step: Option<i64>) -> Option<StepCandidate> {
        self.buffer.push(sample);
        self.peak.record(sample.magnitude);

        let analysis = self.classifier.analyze(&self.buffer);
        self.log_analysis(&analysis);
        self.last_analysis = Some(analysis);

        if !analysis.is_walking {
            return None;
        }

        if let Some(step) = last_step {
            if sample.timestamp.saturating_sub(step) < self.validator.min_step_interval_ms() {
                return None;
            }
        }

        let magnitude = self.peak.peak()?;
        let candidate = StepCandidate::new(magnitude, sample.timestamp);

        match self.validator.validate(candidate, last_step) {
            Verdict::Accepted => Some(candidate),
            Verdict::Rejected(reason) => {
                debug!("Peak {:.2} at {} rejected: {}", magnitude, sample.timestamp, reason);
                None
            }
        }
    }

    fn log_analysis(&self, analysis: &WindowAnalysis) {
        let was_walking = self.last_analysis.map(|a| a.is_walking).unwrap_or(false);
        if analysis.is_walking != was_walking {
            debug!(
                "Walking pattern {}: rhythmic={}, activity={}, vertical={}, mean={:.2}, std={:.2}, y_var={:.3}",
                if analysis.is_walking { "detected" } else { "lost" },
                analysis.rhythmic,
                analysis.plausible_activity,
                analysis.vertical_bounce,
                analysis.mean_magnitude,
                analysis.std_dev,
                analysis.vertical_variance,
            );
        } else {
            trace!("Window analysis: {:?}", analysis);
        }
    }

    /// Clears all transient signal state. Call when the sample stream restarts.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.peak.reset();
        self.validator.reset();
        self.simple.reset();
        self.last_analysis = None;
        self.newest_timestamp = None;
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    pub fn last_analysis(&self) -> Option<&WindowAnalysis> {
        self.last_analysis.as_ref()
    }

    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }

    pub fn set_min_step_interval(&mut self, interval_ms: i64) {
        self.validator.set_min_step_interval(interval_ms);
        self.simple.set_min_step_interval(interval_ms);
    }

    pub fn set_peak_threshold(&mut self, threshold: f64) {
        self.peak.set_threshold(threshold);
    }
}
