use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::DataPoint;

use super::{SampleCallback, SensorError, SensorSource, Subscription};

type CallbackSlot = Arc<Mutex<Option<SampleCallback>>>;

/// Sensor driven by hand: readings are pushed with `emit` on the caller's
/// thread. Used by tests and replays.
#[derive(Default)]
pub struct ManualSensor {
    unavailable: AtomicBool,
    callback: CallbackSlot,
    subscribe_calls: AtomicUsize,
}

impl ManualSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        let sensor = Self::new();
        sensor.set_available(false);
        sensor
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Delivers one reading. Returns false when nobody is subscribed.
    pub fn emit(&self, point: DataPoint) -> bool {
        match lock(&self.callback).as_mut() {
            Some(callback) => {
                callback(point);
                true
            }
            None => false,
        }
    }

    pub fn emit_all(&self, points: impl IntoIterator<Item = DataPoint>) -> usize {
        points.into_iter().filter(|&point| self.emit(point)).count()
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.callback).is_some()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }
}

impl SensorSource for ManualSensor {
    fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    fn subscribe(&self, on_sample: SampleCallback) -> Result<Subscription, SensorError> {
        if !self.is_available() {
            return Err(SensorError::Unavailable);
        }

        let mut slot = lock(&self.callback);
        if slot.is_some() {
            return Err(SensorError::Subscribe("already subscribed".into()));
        }
        *slot = Some(on_sample);
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);

        let callback = Arc::clone(&self.callback);
        Ok(Subscription::new(move || {
            lock(&callback).take();
        }))
    }
}

fn lock(slot: &CallbackSlot) -> MutexGuard<'_, Option<SampleCallback>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_subscriber_until_cancelled() {
        let sensor = ManualSensor::new();
        assert!(!sensor.emit(DataPoint::new(0.0, 0.0, 9.8, 0)));

        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let subscription = sensor
            .subscribe(Box::new(move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        let points = (0..3).map(|i| DataPoint::new(0.0, 0.0, 9.8, i * 50));
        assert_eq!(sensor.emit_all(points), 3);

        subscription.cancel();
        assert!(!sensor.is_subscribed());
        assert!(!sensor.emit(DataPoint::new(0.0, 0.0, 9.8, 200)));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_single_subscriber() {
        let sensor = ManualSensor::new();
        let _first = sensor.subscribe(Box::new(|_| {})).unwrap();
        assert!(matches!(
            sensor.subscribe(Box::new(|_| {})),
            Err(SensorError::Subscribe(_))
        ));
        assert_eq!(sensor.subscribe_calls(), 1);
    }

    #[test]
    fn test_unavailable_refuses_subscription() {
        let sensor = ManualSensor::unavailable();
        assert!(!sensor.is_available());
        assert!(matches!(
            sensor.subscribe(Box::new(|_| {})),
            Err(SensorError::Unavailable)
        ));
    }
}
