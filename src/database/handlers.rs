use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TrySendError};
use log::{debug, error, info, warn};

use crate::config::DatabaseConfig;
use crate::types::StorageTask;

use super::manager::DatabaseManager;
use super::store::StoreError;

/// Thread body owning the database connection. Runs until the shutdown flag
/// is raised or every task sender is dropped.
pub fn run_database_handler(
    config: DatabaseConfig,
    task_receiver: Receiver<StorageTask>,
    shutdown_signal: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    // 在保存线程中创建数据库连接
    let db_manager = match DatabaseManager::new(&config) {
        Ok(db) => {
            info!("Database handler thread: DuckDB initialized successfully");
            db
        }
        Err(e) => {
            error!("Database handler thread: Failed to initialize DuckDB: {}", e);
            return Err(e.into());
        }
    };

    serve_tasks(&db_manager, &task_receiver, &shutdown_signal);
    Ok(())
}

/// Task loop over an already opened database.
pub fn serve_tasks(
    db_manager: &DatabaseManager,
    task_receiver: &Receiver<StorageTask>,
    shutdown_signal: &AtomicBool,
) {
    info!("Database handler thread started");

    while !shutdown_signal.load(Ordering::Relaxed) {
        match task_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(task) => handle_task(db_manager, task),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Database handler: Task channel disconnected, exiting");
                break;
            }
        }
    }

    // Saves queued before shutdown still land; readers are gone by now.
    let mut drained = 0;
    while let Ok(task) = task_receiver.try_recv() {
        if let StorageTask::Save { .. } = task {
            handle_task(db_manager, task);
            drained += 1;
        }
    }
    if drained > 0 {
        info!("Database handler: Wrote {} pending saves before exit", drained);
    }

    info!("Database handler thread exiting gracefully");
}

fn handle_task(db_manager: &DatabaseManager, task: StorageTask) {
    debug!("Database handler: {} task", task.name());

    match task {
        StorageTask::Save { date_key, count } => {
            if let Err(e) = db_manager.save_count(&date_key, count) {
                error!("Database handler: Failed to save {} steps for {}: {}", count, date_key, e);
            }
        }
        StorageTask::Load {
            date_key,
            response_sender,
        } => {
            let count = db_manager.load_count(&date_key).map_err(|e| {
                error!("Database handler: Failed to load steps for {}: {}", date_key, e);
                StoreError::from(e)
            });
            reply(response_sender.try_send(count), "load result");
        }
        StorageTask::History {
            limit,
            response_sender,
        } => {
            let history = db_manager.get_history(limit).map_err(|e| {
                error!("Database handler: Failed to load history: {}", e);
                StoreError::from(e)
            });
            reply(response_sender.try_send(history), "history");
        }
    }
}

fn reply<T>(result: Result<(), TrySendError<T>>, what: &str) {
    match result {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => warn!("Database handler: Reply channel full, dropping {}", what),
        // the requester timed out and went away
        Err(TrySendError::Disconnected(_)) => debug!("Database handler: Nobody waiting for {}", what),
    }
}
