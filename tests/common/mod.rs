#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stephub::calendar::ManualClock;
use stephub::config::AppConfig;
use stephub::database::{MemoryStore, StepStore};
use stephub::registry::StepObserver;
use stephub::sensor::ManualSensor;
use stephub::{DataPoint, StepCounter, StepEvent};

pub const TODAY: &str = "2024-06-01";

/// Walking at 50ms sampling: a peak of `peak` every 600ms starting at
/// `offset_ms`, a 9.8 +/- 0.3 baseline in between and a Y-axis swing with
/// variance around 0.3.
pub fn walking(duration_ms: i64, offset_ms: i64, peak: f64) -> Vec<DataPoint> {
    (0..duration_ms / 50)
        .map(|k| {
            let t = k * 50;
            let phase_ms = (t - offset_ms).rem_euclid(600);
            let phase = phase_ms as f64 / 600.0 * std::f64::consts::TAU;
            let magnitude = if phase_ms == 0 { peak } else { 9.8 + 0.3 * phase.cos() };
            let y = 0.7746 * phase.sin();
            DataPoint::new(0.0, y, (magnitude * magnitude - y * y).sqrt(), t)
        })
        .collect()
}

/// Shifts every timestamp by up to `max_ms` either way.
pub fn jittered(points: Vec<DataPoint>, max_ms: i64, seed: u64) -> Vec<DataPoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    points
        .into_iter()
        .map(|p| DataPoint::new(p.x, p.y, p.z, p.timestamp + rng.random_range(-max_ms..=max_ms)))
        .collect()
}

/// Hand shaking: one reading every 80ms, magnitude flipping between 9.0 and
/// 16.0 on each, so a sharp peak every 160ms.
pub fn shaking(duration_ms: i64) -> Vec<DataPoint> {
    (0..duration_ms / 80)
        .map(|k| {
            let (magnitude, y): (f64, f64) = if k % 2 == 1 { (16.0, 3.0) } else { (9.0, -3.0) };
            DataPoint::new(0.0, y, (magnitude * magnitude - y * y).sqrt(), k * 80)
        })
        .collect()
}

pub fn still(from_ms: i64, duration_ms: i64) -> Vec<DataPoint> {
    (0..duration_ms / 50)
        .map(|k| DataPoint::new(0.1, 0.2, 9.79, from_ms + k * 50))
        .collect()
}

pub fn shifted(points: Vec<DataPoint>, by_ms: i64) -> Vec<DataPoint> {
    points
        .into_iter()
        .map(|p| DataPoint::new(p.x, p.y, p.z, p.timestamp + by_ms))
        .collect()
}

/// A counter wired to a hand-driven sensor, an in-memory or custom store and
/// a manual clock, recording every event it emits.
pub struct Harness {
    pub counter: StepCounter,
    pub sensor: Arc<ManualSensor>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<Mutex<Vec<StepEvent>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(AppConfig::default(), Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn StepStore>) -> Self {
        Self::build(config, ManualSensor::new(), store)
    }

    pub fn build(config: AppConfig, sensor: ManualSensor, store: Arc<dyn StepStore>) -> Self {
        let sensor = Arc::new(sensor);
        let clock = Arc::new(ManualClock::new(1_717_200_000_000, TODAY));
        let counter = StepCounter::new(&config, sensor.clone(), store, clock.clone());

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let recorder: Arc<dyn StepObserver> = Arc::new(move |event: &StepEvent| {
            sink.lock().unwrap().push(*event);
        });
        counter.add_listener(recorder);

        Self {
            counter,
            sensor,
            clock,
            events,
        }
    }

    pub fn feed(&self, points: impl IntoIterator<Item = DataPoint>) {
        for point in points {
            assert!(self.sensor.emit(point), "sensor has no subscriber");
        }
    }

    pub fn events(&self) -> Vec<StepEvent> {
        self.events.lock().unwrap().clone()
    }
}
