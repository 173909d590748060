//! Public face of the step counter: lifecycle, listeners and overrides.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};

use crate::calendar::Clock;
use crate::config::{AppConfig, DetectionMode};
use crate::database::StepStore;
use crate::detector::StepDetector;
use crate::registry::{observers, ObserverSet, StepObserver, StepRegistry};
use crate::sensor::{SensorSource, Subscription};
use crate::types::{DataPoint, StepEvent};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CounterError {
    #[error("step count must not be negative, got {0}")]
    NegativeStepCount(i64),
    #[error("manual overrides are disabled while the counter is listening")]
    ManualOverrideWhileListening,
}

struct Engine {
    detector: StepDetector,
    registry: StepRegistry,
    listening: bool,
}

impl Engine {
    fn process(&mut self, point: DataPoint) -> Option<StepEvent> {
        match self.detector.process(point, self.registry.last_step()) {
            Ok(Some(candidate)) => Some(self.registry.register_step(candidate.timestamp)),
            Ok(None) => None,
            Err(e) => {
                warn!("Skipping sample: {}", e);
                None
            }
        }
    }
}

/// State reachable from the sensor callback.
struct Shared {
    engine: Mutex<Engine>,
    observers: ObserverSet,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_sample(&self, point: DataPoint) {
        let event = {
            let mut engine = self.lock();
            if !engine.listening {
                return;
            }
            engine.process(point)
        };

        // observers run without the engine lock held
        if let Some(event) = event {
            self.observers.notify(&event);
        }
    }
}

/// Counts steps from a sensor stream and keeps today's total.
///
/// States are stopped and listening. `start` and `stop` are idempotent.
/// Observers are called on the thread delivering samples. A `stop` issued
/// from inside an observer is refused and logged, since the delivering
/// thread cannot wait for itself.
pub struct StepCounter {
    shared: Arc<Shared>,
    sensor: Arc<dyn SensorSource>,
    subscription: Mutex<Option<Subscription>>,
    reject_manual_while_listening: bool,
}

impl StepCounter {
    pub fn new(
        config: &AppConfig,
        sensor: Arc<dyn SensorSource>,
        store: Arc<dyn StepStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut registry = StepRegistry::new(&config.registry, store, clock);
        if config.detector.mode == DetectionMode::Simple {
            // lenient mode persists every step
            registry = registry.with_checkpoint_every(1);
        }

        let engine = Engine {
            detector: StepDetector::new(config.detector.clone()),
            registry,
            listening: false,
        };

        Self {
            shared: Arc::new(Shared {
                engine: Mutex::new(engine),
                observers: ObserverSet::new(),
            }),
            sensor,
            subscription: Mutex::new(None),
            reject_manual_while_listening: config.registry.reject_manual_while_listening,
        }
    }

    /// Begins listening. Returns false, and stays stopped, when the sensor is
    /// unavailable or refuses the subscription. The event carrying the loaded
    /// total reaches observers before the first sample can.
    pub fn start(&self) -> bool {
        if observers::is_notifying() {
            debug!("start() called from a step listener, reporting current state");
            return self.is_listening();
        }

        let mut subscription = self.lock_subscription();
        if subscription.is_some() {
            debug!("Step counter already listening");
            return true;
        }

        if !self.sensor.is_available() {
            warn!("Accelerometer not available, step counter not started");
            return false;
        }

        let event = {
            let mut engine = self.shared.lock();
            engine.registry.load_today();
            engine.detector.reset();
            engine.listening = true;
            engine.registry.snapshot()
        };

        info!("Step counter started at {} steps", event.steps);
        self.shared.observers.notify(&event);

        let shared = Arc::clone(&self.shared);
        match self
            .sensor
            .subscribe(Box::new(move |point| shared.on_sample(point)))
        {
            Ok(handle) => {
                *subscription = Some(handle);
                true
            }
            Err(e) => {
                error!("Failed to start step counter: {}", e);
                self.shared.lock().listening = false;
                false
            }
        }
    }

    /// Stops listening and flushes the total. No sample reaches the detector
    /// after this returns.
    pub fn stop(&self) {
        if observers::is_notifying() {
            error!("stop() called from a step listener, ignoring");
            return;
        }

        let Some(subscription) = self.lock_subscription().take() else {
            debug!("Step counter not listening, nothing to stop");
            return;
        };

        self.shared.lock().listening = false;
        subscription.cancel();

        let engine = self.shared.lock();
        engine.registry.flush();
        info!("Step counter stopped at {} steps", engine.registry.count());
    }

    pub fn is_listening(&self) -> bool {
        self.shared.lock().listening
    }

    pub fn is_sensor_available(&self) -> bool {
        self.sensor.is_available()
    }

    pub fn add_listener(&self, observer: Arc<dyn StepObserver>) {
        self.shared.observers.add(observer);
    }

    pub fn remove_listener(&self, observer: &Arc<dyn StepObserver>) -> bool {
        self.shared.observers.remove(observer)
    }

    pub fn get_current_steps(&self) -> u64 {
        self.shared.lock().registry.count()
    }

    /// Today's total. When stopped this re-reads the store first.
    pub fn get_today_steps(&self) -> u64 {
        let mut engine = self.shared.lock();
        if engine.listening {
            engine.registry.count()
        } else {
            engine.registry.load_today()
        }
    }

    pub fn manual_set_steps(&self, count: i64) -> Result<(), CounterError> {
        let count = self.check_manual(count)?;
        let event = self.shared.lock().registry.set_count(count);
        self.shared.observers.notify(&event);
        Ok(())
    }

    pub fn manual_add_steps(&self, count: i64) -> Result<(), CounterError> {
        let count = self.check_manual(count)?;
        let event = self.shared.lock().registry.add_count(count);
        self.shared.observers.notify(&event);
        Ok(())
    }

    /// Zeroes the total under the clock's current day key. The counter never
    /// calls this itself.
    pub fn reset_daily_steps(&self) {
        let event = self.shared.lock().registry.reset_daily();
        self.shared.observers.notify(&event);
    }

    pub fn set_min_step_interval(&self, interval_ms: i64) {
        info!("Minimum step interval set to {}ms", interval_ms);
        self.shared.lock().detector.set_min_step_interval(interval_ms);
    }

    pub fn set_peak_threshold(&self, threshold: f64) {
        info!("Peak threshold set to {:.2}", threshold);
        self.shared.lock().detector.set_peak_threshold(threshold);
    }

    fn check_manual(&self, count: i64) -> Result<u64, CounterError> {
        if count < 0 {
            return Err(CounterError::NegativeStepCount(count));
        }
        if self.reject_manual_while_listening && self.is_listening() {
            return Err(CounterError::ManualOverrideWhileListening);
        }
        Ok(count as u64)
    }

    fn lock_subscription(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StepCounter {
    fn drop(&mut self) {
        self.stop();
    }
}
