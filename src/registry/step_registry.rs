use std::sync::Arc;

use log::{debug, info, warn};

use crate::calendar::Clock;
use crate::config::RegistryConfig;
use crate::database::StepStore;
use crate::types::StepEvent;

/// Authoritative daily counter.
///
/// Holds the running total, the time of the last accepted step and the day
/// key the total belongs to. Checkpoints to the store every
/// `checkpoint_every` steps and on explicit flushes; store failures are
/// logged and never reach the caller, the in-memory total stays authoritative.
pub struct StepRegistry {
    count: u64,
    last_step: Option<i64>,
    day_key: String,
    checkpoint_every: u64,
    store: Arc<dyn StepStore>,
    clock: Arc<dyn Clock>,
}

impl StepRegistry {
    pub fn new(config: &RegistryConfig, store: Arc<dyn StepStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            count: 0,
            last_step: None,
            day_key: clock.today_key(),
            checkpoint_every: config.checkpoint_every.max(1),
            store,
            clock,
        }
    }

    /// Overrides the checkpoint cadence; zero is treated as one.
    pub fn with_checkpoint_every(mut self, steps: u64) -> Self {
        self.checkpoint_every = steps.max(1);
        self
    }

    /// Loads the persisted total for today. Within the same day the total
    /// never goes down, so a stale stored value does not undo counted steps.
    pub fn load_today(&mut self) -> u64 {
        let today = self.clock.today_key();
        if today != self.day_key {
            info!("Day changed from {} to {}, starting from stored total", self.day_key, today);
            self.day_key = today;
            self.count = 0;
            self.last_step = None;
        }

        match self.store.load_count(&self.day_key) {
            Ok(Some(stored)) => {
                self.count = self.count.max(stored);
                info!("Loaded {} steps for {}", stored, self.day_key);
            }
            Ok(None) => debug!("No stored steps for {}", self.day_key),
            Err(e) => warn!("Failed to load steps for {}, keeping {}: {}", self.day_key, self.count, e),
        }

        self.count
    }

    pub fn register_step(&mut self, timestamp: i64) -> StepEvent {
        self.count += 1;
        self.last_step = Some(timestamp);

        if self.count <= 5 || self.count % 25 == 0 {
            info!("Step {} registered", self.count);
        } else {
            debug!("Step {} registered", self.count);
        }

        if self.count % self.checkpoint_every == 0 {
            self.persist();
        }

        self.snapshot()
    }

    /// Overwrites the total, persists right away.
    pub fn set_count(&mut self, count: u64) -> StepEvent {
        info!("Step count manually set from {} to {}", self.count, count);
        self.count = count;
        self.persist();
        self.snapshot()
    }

    pub fn add_count(&mut self, delta: u64) -> StepEvent {
        let total = self.count.saturating_add(delta);
        info!("Manually adding {} steps ({} -> {})", delta, self.count, total);
        self.count = total;
        self.persist();
        self.snapshot()
    }

    /// Starts a new day: takes the current day key from the clock and zeroes
    /// the total.
    pub fn reset_daily(&mut self) -> StepEvent {
        self.day_key = self.clock.today_key();
        self.count = 0;
        self.last_step = None;
        info!("Daily steps reset for {}", self.day_key);
        self.persist();
        self.snapshot()
    }

    pub fn flush(&self) {
        debug!("Flushing {} steps for {}", self.count, self.day_key);
        self.persist();
    }

    pub fn snapshot(&self) -> StepEvent {
        StepEvent::new(self.count, self.clock.now_ms())
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn last_step(&self) -> Option<i64> {
        self.last_step
    }

    pub fn day_key(&self) -> &str {
        &self.day_key
    }

    fn persist(&self) {
        if let Err(e) = self.store.save_count(&self.day_key, self.count) {
            warn!("Failed to persist {} steps for {}: {}", self.count, self.day_key, e);
        }
    }
}
