//! Final admission gate for peak candidates.

use std::collections::VecDeque;
use std::fmt;

use crate::config::ValidatorConfig;
use crate::types::StepCandidate;
use crate::utils::mean;

/// Why a candidate was not counted. Rejections are routine, not faults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    TooSoon { elapsed_ms: i64 },
    GapTooLong { elapsed_ms: i64 },
    MagnitudeOutOfRange { magnitude: f64 },
    IrregularRhythm { consistency: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooSoon { elapsed_ms } => write!(f, "too soon ({}ms after last step)", elapsed_ms),
            Rejection::GapTooLong { elapsed_ms } => write!(f, "gap too long ({}ms), new bout", elapsed_ms),
            Rejection::MagnitudeOutOfRange { magnitude } => write!(f, "magnitude {:.2} out of range", magnitude),
            Rejection::IrregularRhythm { consistency } => {
                write!(f, "irregular rhythm ({:.0}% consistent)", consistency * 100.0)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Applies timing, magnitude and rhythm-consistency checks to candidates.
///
/// Timing is measured against the last accepted step, or against the
/// candidate that opened the current bout when that one is more recent.
#[derive(Debug, Clone)]
pub struct StepValidator {
    config: ValidatorConfig,
    candidates: VecDeque<StepCandidate>,
    bout_anchor: Option<i64>,
}

impl StepValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        let capacity = config.candidate_history;
        Self {
            config,
            candidates: VecDeque::with_capacity(capacity),
            bout_anchor: None,
        }
    }

    pub fn validate(&mut self, candidate: StepCandidate, last_step: Option<i64>) -> Verdict {
        if let Some(reference) = self.timing_reference(last_step) {
            let elapsed_ms = candidate.timestamp.saturating_sub(reference);
            if elapsed_ms < self.config.min_step_interval_ms {
                return Verdict::Rejected(Rejection::TooSoon { elapsed_ms });
            }
            if elapsed_ms > self.config.max_step_interval_ms {
                self.bout_anchor = Some(candidate.timestamp);
                self.candidates.clear();
                return Verdict::Rejected(Rejection::GapTooLong { elapsed_ms });
            }
        }

        if candidate.magnitude <= self.config.min_magnitude
            || candidate.magnitude >= self.config.max_magnitude
        {
            return Verdict::Rejected(Rejection::MagnitudeOutOfRange {
                magnitude: candidate.magnitude,
            });
        }

        if self.candidates.len() == self.config.candidate_history {
            self.candidates.pop_front();
        }
        self.candidates.push_back(candidate);

        if self.candidates.len() >= self.config.min_candidates_for_consistency {
            let consistency = self.rhythm_consistency();
            if consistency < self.config.min_consistency_ratio {
                return Verdict::Rejected(Rejection::IrregularRhythm { consistency });
            }
        }

        Verdict::Accepted
    }

    /// Share of consecutive-candidate intervals within tolerance of their mean.
    fn rhythm_consistency(&self) -> f64 {
        let intervals: Vec<f64> = self
            .candidates
            .iter()
            .zip(self.candidates.iter().skip(1))
            .map(|(a, b)| b.timestamp.saturating_sub(a.timestamp) as f64)
            .collect();

        if intervals.is_empty() {
            return 1.0;
        }

        let average = mean(intervals.iter().copied());
        let consistent = intervals
            .iter()
            .filter(|&&dt| (dt - average).abs() < self.config.consistency_tolerance_ms)
            .count();

        consistent as f64 / intervals.len() as f64
    }

    fn timing_reference(&self, last_step: Option<i64>) -> Option<i64> {
        match (last_step, self.bout_anchor) {
            (Some(step), Some(anchor)) => Some(step.max(anchor)),
            (step, anchor) => step.or(anchor),
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn min_step_interval_ms(&self) -> i64 {
        self.config.min_step_interval_ms
    }

    pub fn set_min_step_interval(&mut self, interval_ms: i64) {
        self.config.min_step_interval_ms = interval_ms;
    }

    pub fn reset(&mut self) {
        self.candidates.clear();
        self.bout_anchor = None;
    }
}
