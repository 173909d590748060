use serde::{Deserialize, Serialize};

/// A peak that passed the detector and is offered to the validator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepCandidate {
    pub magnitude: f64,
    pub timestamp: i64,
}

impl StepCandidate {
    pub fn new(magnitude: f64, timestamp: i64) -> Self {
        Self { magnitude, timestamp }
    }
}

/// Snapshot broadcast to observers after every change of the daily total.
///
/// `steps` and `daily_steps` carry the same running total; both are kept so
/// consumers written against either name keep working.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepEvent {
    pub steps: u64,
    pub timestamp: i64,
    #[serde(rename = "dailySteps")]
    pub daily_steps: u64,
}

impl StepEvent {
    pub fn new(total: u64, timestamp: i64) -> Self {
        Self {
            steps: total,
            timestamp,
            daily_steps: total,
        }
    }
}
