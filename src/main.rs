use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use dotenv::dotenv;
use log::{error, info, warn};

use stephub::calendar::SystemClock;
use stephub::config::ConfigManager;
use stephub::database::{run_database_handler, DuckDbStore};
use stephub::logger;
use stephub::registry::StepObserver;
use stephub::sensor::{run_mqtt_client, ChannelSensor};
use stephub::utils::format_timestamp;
use stephub::{StepCounter, StepEvent};

fn main() {
    dotenv().ok(); // 加载 .env 文件

    let config_manager = match env::var("STEPHUB_CONFIG") {
        Ok(path) => match ConfigManager::load_from_file(&path) {
            Ok(manager) => manager,
            Err(e) => {
                eprintln!("Failed to load config from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        Err(_) => ConfigManager::new(),
    };
    let config = config_manager.get_config().clone();

    logger::init_logger(&config.logging.default_filter);
    info!("Application starting");
    match config_manager.config_path() {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("STEPHUB_CONFIG not set, using default configuration"),
    }

    info!("Step totals stored under {}", config.get_data_directory().display());

    let shutdown_signal = Arc::new(AtomicBool::new(false));

    let (task_sender, task_receiver) = bounded(config.channels.storage_task_channel_capacity);
    let db_config = config.database.clone();
    let db_shutdown = Arc::clone(&shutdown_signal);
    let db_handle = thread::spawn(move || {
        if let Err(e) = run_database_handler(db_config, task_receiver, db_shutdown) {
            error!("Database thread failed: {}", e);
        }
    });

    let store = Arc::new(DuckDbStore::new(
        task_sender,
        Duration::from_millis(config.database.load_timeout_ms),
    ));
    match store.history(7) {
        Ok(history) if !history.is_empty() => {
            for day in history {
                info!("History {}: {} steps", day.date_key, day.count);
            }
        }
        Ok(_) => info!("No step history yet"),
        Err(e) => warn!("Failed to read step history: {}", e),
    }

    let (data_sender, data_receiver) = bounded(config.channels.sample_channel_capacity);
    let mqtt_config = config.mqtt.clone();
    let mqtt_shutdown = Arc::clone(&shutdown_signal);
    let mqtt_handle = thread::spawn(move || {
        if let Err(e) = run_mqtt_client(&mqtt_config, data_sender, mqtt_shutdown) {
            error!("MQTT thread failed: {}", e);
        }
    });

    let counter = StepCounter::new(
        &config,
        Arc::new(ChannelSensor::new(data_receiver)),
        store,
        Arc::new(SystemClock),
    );
    let step_logger: Arc<dyn StepObserver> = Arc::new(|event: &StepEvent| {
        info!("Steps today: {} ({})", event.daily_steps, format_timestamp(event.timestamp));
    });
    counter.add_listener(step_logger);

    if !counter.start() {
        error!("Step counter could not start");
    } else if mqtt_handle.join().is_err() {
        // the MQTT thread owns the only sample sender, so the stream ends with it
        error!("MQTT thread panicked");
    }

    info!("Sample stream ended, stopping step counter");
    counter.stop();
    drop(counter);

    shutdown_signal.store(true, Ordering::Relaxed);
    match db_handle.join() {
        Ok(()) => info!("Database thread shut down gracefully"),
        Err(e) => error!("Database thread panicked: {:?}", e),
    }
}
