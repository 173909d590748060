use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

/// Source of wall-clock time and of the key naming "today" in storage.
///
/// The counter never watches for midnight itself; callers decide when the
/// day changes and call `reset_daily_steps`.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
    fn today_key(&self) -> String;
}

/// Formats a day key the way persisted totals are named: `YYYY-MM-DD` (UTC).
pub fn day_key(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today_key(&self) -> String {
        day_key(Utc::now())
    }
}

/// Clock driven by hand, for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
    day: Mutex<String>,
}

impl ManualClock {
    pub fn new(now_ms: i64, day: impl Into<String>) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
            day: Mutex::new(day.into()),
        }
    }

    pub fn set_now(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn set_day(&self, day: impl Into<String>) {
        *self.day.lock().unwrap_or_else(PoisonError::into_inner) = day.into();
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn today_key(&self) -> String {
        self.day.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_key_format() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        assert_eq!(day_key(time), "2024-03-09");
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000, "2024-03-09");
        clock.advance(500);
        assert_eq!(clock.now_ms(), 1_500);

        clock.set_day("2024-03-10");
        clock.set_now(42);
        assert_eq!(clock.today_key(), "2024-03-10");
        assert_eq!(clock.now_ms(), 42);
    }

    #[test]
    fn test_system_clock_key_matches_now() {
        let clock = SystemClock;
        let key = clock.today_key();
        assert_eq!(key.len(), 10);
        assert!(clock.now_ms() > 0);
    }
}
