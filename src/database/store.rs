//! Persistence seam between the step registry and whatever keeps daily totals.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender, TrySendError};

use crate::types::{DailyTotal, StorageTask};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),
    #[error("storage queue is full")]
    QueueFull,
    #[error("storage thread is not running")]
    Disconnected,
    #[error("storage did not answer within {0:?}")]
    Timeout(Duration),
}

/// Key-value store of step totals by day key (`YYYY-MM-DD`).
pub trait StepStore: Send + Sync {
    /// `Ok(None)` when nothing was stored for that day.
    fn load_count(&self, date_key: &str) -> Result<Option<u64>, StoreError>;

    fn save_count(&self, date_key: &str, count: u64) -> Result<(), StoreError>;
}

/// Front end of the database handler thread.
///
/// Saves are queued without waiting; loads block until the handler replies
/// or the configured timeout runs out.
#[derive(Clone)]
pub struct DuckDbStore {
    task_sender: Sender<StorageTask>,
    load_timeout: Duration,
}

impl DuckDbStore {
    pub fn new(task_sender: Sender<StorageTask>, load_timeout: Duration) -> Self {
        Self {
            task_sender,
            load_timeout,
        }
    }

    pub fn history(&self, limit: usize) -> Result<Vec<DailyTotal>, StoreError> {
        let (response_sender, response) = bounded(1);
        self.enqueue(StorageTask::History {
            limit,
            response_sender,
        })?;
        self.wait(response.recv_timeout(self.load_timeout))?
    }

    fn enqueue(&self, task: StorageTask) -> Result<(), StoreError> {
        self.task_sender.try_send(task).map_err(|e| match e {
            TrySendError::Full(_) => StoreError::QueueFull,
            TrySendError::Disconnected(_) => StoreError::Disconnected,
        })
    }

    fn wait<T>(&self, result: Result<T, RecvTimeoutError>) -> Result<T, StoreError> {
        result.map_err(|e| match e {
            RecvTimeoutError::Timeout => StoreError::Timeout(self.load_timeout),
            RecvTimeoutError::Disconnected => StoreError::Disconnected,
        })
    }
}

impl StepStore for DuckDbStore {
    fn load_count(&self, date_key: &str) -> Result<Option<u64>, StoreError> {
        let (response_sender, response) = bounded(1);
        self.enqueue(StorageTask::Load {
            date_key: date_key.to_string(),
            response_sender,
        })?;
        self.wait(response.recv_timeout(self.load_timeout))?
    }

    fn save_count(&self, date_key: &str, count: u64) -> Result<(), StoreError> {
        self.enqueue(StorageTask::Save {
            date_key: date_key.to_string(),
            count,
        })
    }
}

/// In-process store, used by tests and when no database is wanted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    counts: Mutex<HashMap<String, u64>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(date_key: &str, count: u64) -> Self {
        let store = Self::new();
        store
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(date_key.to_string(), count);
        store
    }

    pub fn get(&self, date_key: &str) -> Option<u64> {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(date_key)
            .copied()
    }

    /// Number of successful `save_count` calls so far.
    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StepStore for MemoryStore {
    fn load_count(&self, date_key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.get(date_key))
    }

    fn save_count(&self, date_key: &str, count: u64) -> Result<(), StoreError> {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(date_key.to_string(), count);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
