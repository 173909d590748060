//! Walking pattern classification over the sliding window.
//!
//! Three independent checks vote on the window:
//! - rhythm: local magnitude peaks spaced like footfalls
//! - activity: mean magnitude and spread inside a plausible band
//! - vertical: Y-axis variance showing the bounce of a gait
//!
//! All three agreeing is a walk. With `fallback_voting` enabled, the pairs
//! rhythm+activity, rhythm+vertical and activity+vertical (the last one only
//! above `fallback_min_std_dev`) are accepted as well.

use crate::config::ClassifierConfig;
use crate::utils::{mean, variance};

use super::buffer::SampleBuffer;

/// Outcome of one classification pass, kept for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowAnalysis {
    pub sample_count: usize,
    pub mean_magnitude: f64,
    pub std_dev: f64,
    pub vertical_variance: f64,
    pub rhythmic: bool,
    pub plausible_activity: bool,
    pub vertical_bounce: bool,
    pub is_walking: bool,
}

impl WindowAnalysis {
    fn insufficient(sample_count: usize) -> Self {
        Self {
            sample_count,
            mean_magnitude: 0.0,
            std_dev: 0.0,
            vertical_variance: 0.0,
            rhythmic: false,
            plausible_activity: false,
            vertical_bounce: false,
            is_walking: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalkingClassifier {
    config: ClassifierConfig,
    min_samples: usize,
}

impl WalkingClassifier {
    pub fn new(config: ClassifierConfig, min_samples: usize) -> Self {
        Self { config, min_samples }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classifies the current window. Never fails; too little data is "not walking".
    pub fn analyze(&self, buffer: &SampleBuffer) -> WindowAnalysis {
        let sample_count = buffer.len();
        if sample_count < self.min_samples {
            return WindowAnalysis::insufficient(sample_count);
        }

        let magnitudes: Vec<f64> = buffer.iter().map(|s| s.magnitude).collect();
        let timestamps: Vec<i64> = buffer.iter().map(|s| s.timestamp).collect();
        let vertical: Vec<f64> = buffer.iter().map(|s| s.y).collect();

        let mean_magnitude = mean(magnitudes.iter().copied());
        let std_dev = variance(&magnitudes).sqrt();
        let vertical_variance = variance(&vertical);

        let cfg = &self.config;
        let rhythmic = self.has_rhythm(&magnitudes, &timestamps);
        let plausible_activity = mean_magnitude > cfg.min_mean_magnitude
            && mean_magnitude < cfg.max_mean_magnitude
            && std_dev > cfg.min_std_dev
            && std_dev < cfg.max_std_dev;
        let vertical_bounce = vertical_variance > cfg.min_vertical_variance
            && vertical_variance < cfg.max_vertical_variance;

        let unanimous = rhythmic && plausible_activity && vertical_bounce;
        let majority = cfg.fallback_voting
            && ((rhythmic && plausible_activity)
                || (rhythmic && vertical_bounce)
                || (plausible_activity && vertical_bounce && std_dev > cfg.fallback_min_std_dev));

        WindowAnalysis {
            sample_count,
            mean_magnitude,
            std_dev,
            vertical_variance,
            rhythmic,
            plausible_activity,
            vertical_bounce,
            is_walking: unanimous || majority,
        }
    }

    fn has_rhythm(&self, magnitudes: &[f64], timestamps: &[i64]) -> bool {
        let peaks: Vec<i64> = (1..magnitudes.len().saturating_sub(1))
            .filter(|&i| magnitudes[i] > magnitudes[i - 1] && magnitudes[i] > magnitudes[i + 1])
            .map(|i| timestamps[i])
            .collect();

        if peaks.len() < 2 {
            return false;
        }

        let intervals: Vec<i64> = peaks.windows(2).map(|w| w[1] - w[0]).collect();
        let in_range = intervals
            .iter()
            .filter(|&&dt| {
                dt >= self.config.rhythm_min_interval_ms && dt <= self.config.rhythm_max_interval_ms
            })
            .count();

        in_range as f64 / intervals.len() as f64 >= self.config.rhythm_min_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;

    fn classifier() -> WalkingClassifier {
        WalkingClassifier::new(ClassifierConfig::default(), 10)
    }

    fn fill(buffer: &mut SampleBuffer, count: i64, f: impl Fn(i64) -> (f64, f64)) {
        for i in 0..count {
            let (magnitude, y) = f(i);
            let z = (magnitude * magnitude - y * y).sqrt();
            buffer.push(Sample::new(0.0, y, z, i * 50));
        }
    }

    /// Peak of 11.0 every 600ms over a 9.8 baseline, Y swinging with the gait.
    fn gait(i: i64) -> (f64, f64) {
        let phase_ms = (i * 50).rem_euclid(600);
        let phase = phase_ms as f64 / 600.0 * std::f64::consts::TAU;
        let magnitude = if phase_ms == 0 { 11.0 } else { 9.8 + 0.3 * phase.cos() };
        (magnitude, 0.7746 * phase.sin())
    }

    #[test]
    fn test_insufficient_samples_is_not_walking() {
        let mut buffer = SampleBuffer::new(2000);
        fill(&mut buffer, 9, gait);

        let analysis = classifier().analyze(&buffer);
        assert_eq!(analysis.sample_count, 9);
        assert!(!analysis.is_walking);
        assert!(!analysis.rhythmic);
    }

    #[test]
    fn test_gait_window_is_walking() {
        let mut buffer = SampleBuffer::new(2000);
        fill(&mut buffer, 60, gait);

        let analysis = classifier().analyze(&buffer);
        assert!(analysis.rhythmic);
        assert!(analysis.plausible_activity, "{:?}", analysis);
        assert!(analysis.vertical_bounce, "{:?}", analysis);
        assert!(analysis.is_walking);
    }

    #[test]
    fn test_still_device_is_not_walking() {
        let mut buffer = SampleBuffer::new(2000);
        fill(&mut buffer, 40, |_| (9.81, 0.0));

        let analysis = classifier().analyze(&buffer);
        assert!(!analysis.rhythmic);
        assert!(!analysis.plausible_activity);
        assert!(!analysis.vertical_bounce);
        assert!(!analysis.is_walking);
    }

    #[test]
    fn test_fast_shaking_has_no_rhythm() {
        let mut buffer = SampleBuffer::new(2000);
        // alternate every sample: a peak every 100ms
        fill(&mut buffer, 40, |i| if i % 2 == 0 { (9.0, -3.0) } else { (16.0, 3.0) });

        let analysis = classifier().analyze(&buffer);
        assert!(!analysis.rhythmic);
        assert!(!analysis.plausible_activity, "std dev {}", analysis.std_dev);
        assert!(!analysis.is_walking);
    }

    #[test]
    fn test_rhythm_with_vertical_bounce_is_enough() {
        // Mean far above the activity band, but rhythm and bounce agree.
        let mut buffer = SampleBuffer::new(2000);
        fill(&mut buffer, 40, |i| {
            let (magnitude, y) = gait(i);
            (magnitude + 8.0, y)
        });

        let analysis = classifier().analyze(&buffer);
        assert!(analysis.rhythmic);
        assert!(!analysis.plausible_activity);
        assert!(analysis.vertical_bounce);
        assert!(analysis.is_walking);

        let strict = WalkingClassifier::new(
            ClassifierConfig {
                fallback_voting: false,
                ..ClassifierConfig::default()
            },
            10,
        );
        assert!(!strict.analyze(&buffer).is_walking);
    }

    #[test]
    fn test_activity_and_vertical_pair_needs_extra_spread() {
        // Irregular wobble: in the activity band with Y bounce, but no footfall rhythm.
        let wobble = |spread: f64| {
            move |i: i64| {
                let magnitude = 9.8 + if i % 2 == 0 { spread } else { -spread };
                let y = if i % 2 == 0 { 0.6 } else { -0.6 };
                (magnitude, y)
            }
        };

        let mut low = SampleBuffer::new(2000);
        fill(&mut low, 40, wobble(0.4));
        let analysis = classifier().analyze(&low);
        assert!(!analysis.rhythmic);
        assert!(analysis.plausible_activity && analysis.vertical_bounce);
        assert!(analysis.std_dev <= 0.5);
        assert!(!analysis.is_walking);

        let mut high = SampleBuffer::new(2000);
        fill(&mut high, 40, wobble(0.8));
        let analysis = classifier().analyze(&high);
        assert!(!analysis.rhythmic);
        assert!(analysis.std_dev > 0.5);
        assert!(analysis.is_walking);

        let tuned = WalkingClassifier::new(
            ClassifierConfig {
                fallback_min_std_dev: 1.0,
                ..ClassifierConfig::default()
            },
            10,
        );
        assert!(!tuned.analyze(&high).is_walking);
    }
}
