//! Application configuration.
//! All tunables live here with their defaults; every section may be omitted
//! from the toml file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub registry: RegistryConfig,
    pub database: DatabaseConfig,
    pub mqtt: MqttConfig,
    pub channels: ChannelConfig,
    pub logging: LoggingConfig,
}

/// Which step detection algorithm consumes the sample stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Windowed walking classification, peak detection and validation.
    Pattern,
    /// Lenient magnitude-jump detector, no walking classification.
    Simple,
}

/// Step detection pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub mode: DetectionMode,
    /// Length of the sliding sample window.
    pub window_ms: i64,
    /// Fewer buffered samples than this always classify as "not walking".
    pub min_buffer_samples: usize,
    pub classifier: ClassifierConfig,
    pub peak: PeakConfig,
    pub validator: ValidatorConfig,
    pub simple: SimpleModeConfig,
}

/// Walking pattern classifier thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub rhythm_min_interval_ms: i64,
    pub rhythm_max_interval_ms: i64,
    /// Share of inter-peak intervals that must fall inside the rhythm range.
    pub rhythm_min_ratio: f64,
    pub min_mean_magnitude: f64,
    pub max_mean_magnitude: f64,
    pub min_std_dev: f64,
    pub max_std_dev: f64,
    pub min_vertical_variance: f64,
    pub max_vertical_variance: f64,
    /// Accept two-of-three check combinations when the full vote fails.
    pub fallback_voting: bool,
    /// Extra standard deviation floor for the activity + vertical pairing.
    pub fallback_min_std_dev: f64,
}

/// Peak candidate detector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// A peak must rise strictly above this magnitude (m/s²).
    pub threshold: f64,
}

/// Step validator thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub min_step_interval_ms: i64,
    pub max_step_interval_ms: i64,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    /// Size of the recent-candidate ring.
    pub candidate_history: usize,
    /// Rhythm consistency is only checked once this many candidates are held.
    pub min_candidates_for_consistency: usize,
    pub consistency_tolerance_ms: f64,
    pub min_consistency_ratio: f64,
}

/// Simple detection mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleModeConfig {
    pub min_magnitude_change: f64,
    pub min_step_interval_ms: i64,
}

/// Step registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Persist the daily total after every N accepted steps.
    pub checkpoint_every: u64,
    /// Refuse manual overrides while the sensor stream is live.
    pub reject_manual_while_listening: bool,
}

/// Database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub auto_create_dir: bool,
    pub load_timeout_ms: u64,
}

/// MQTT
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub topic: String,
    pub qos: u8,
    pub keep_alive: u16,
}

/// Channel capacities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub sample_channel_capacity: usize,
    pub storage_task_channel_capacity: usize,
}

/// Logging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mode: DetectionMode::Pattern,
            window_ms: 2000,
            min_buffer_samples: 10, // ~0.5s at 50ms sampling
            classifier: ClassifierConfig::default(),
            peak: PeakConfig::default(),
            validator: ValidatorConfig::default(),
            simple: SimpleModeConfig::default(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rhythm_min_interval_ms: 250,
            rhythm_max_interval_ms: 1500,
            rhythm_min_ratio: 0.5,
            min_mean_magnitude: 8.5,
            max_mean_magnitude: 15.0,
            min_std_dev: 0.2,
            max_std_dev: 3.0,
            min_vertical_variance: 0.05,
            max_vertical_variance: 5.0,
            fallback_voting: true,
            fallback_min_std_dev: 0.5,
        }
    }
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self { threshold: 9.5 }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_step_interval_ms: 250,  // ~4 steps/s
            max_step_interval_ms: 2000, // slower than this is not continuous walking
            min_magnitude: 9.5,
            max_magnitude: 18.0,
            candidate_history: 5,
            min_candidates_for_consistency: 3,
            consistency_tolerance_ms: 300.0,
            min_consistency_ratio: 0.6,
        }
    }
}

impl Default for SimpleModeConfig {
    fn default() -> Self {
        Self {
            min_magnitude_change: 1.0,
            min_step_interval_ms: 500,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            checkpoint_every: 5,
            reject_manual_while_listening: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/step_counts.db".to_string(),
            auto_create_dir: true,
            load_timeout_ms: 1000,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "stephub_client".to_string(),
            topic: "sensors".to_string(),
            qos: 1,
            keep_alive: 5,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            sample_channel_capacity: 5000,
            storage_task_channel_capacity: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a toml file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from toml text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a toml file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::IoError)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let detector = &self.detector;
        if detector.window_ms <= 0 {
            return Err(invalid("Detector window must be positive"));
        }
        if detector.min_buffer_samples < 3 {
            return Err(invalid("Detector needs at least 3 buffered samples"));
        }

        let classifier = &detector.classifier;
        if classifier.rhythm_min_interval_ms >= classifier.rhythm_max_interval_ms {
            return Err(invalid("Rhythm interval range is empty"));
        }
        if classifier.min_mean_magnitude >= classifier.max_mean_magnitude
            || classifier.min_std_dev >= classifier.max_std_dev
            || classifier.min_vertical_variance >= classifier.max_vertical_variance
        {
            return Err(invalid("Classifier activity ranges must be ordered"));
        }
        if !(0.0..=1.0).contains(&classifier.rhythm_min_ratio) {
            return Err(invalid("Rhythm ratio must be within [0, 1]"));
        }

        let validator = &detector.validator;
        if validator.min_step_interval_ms < 0
            || validator.min_step_interval_ms >= validator.max_step_interval_ms
        {
            return Err(invalid("Step interval range is empty"));
        }
        if validator.min_magnitude >= validator.max_magnitude {
            return Err(invalid("Step magnitude range is empty"));
        }
        if validator.candidate_history < 2 {
            return Err(invalid("Candidate history must hold at least 2 candidates"));
        }
        if !(0.0..=1.0).contains(&validator.min_consistency_ratio) {
            return Err(invalid("Consistency ratio must be within [0, 1]"));
        }

        if self.registry.checkpoint_every == 0 {
            return Err(invalid("Checkpoint cadence must be positive"));
        }

        if self.channels.sample_channel_capacity == 0
            || self.channels.storage_task_channel_capacity == 0
        {
            return Err(invalid("Channel capacities must be positive"));
        }

        Ok(())
    }

    /// Database file path
    pub fn get_database_path(&self) -> PathBuf {
        PathBuf::from(&self.database.path)
    }

    /// Directory holding the database file
    pub fn get_data_directory(&self) -> PathBuf {
        self.get_database_path()
            .parent()
            .unwrap_or(std::path::Path::new("."))
            .to_path_buf()
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Holds the active configuration and where it came from
pub struct ConfigManager {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            config_path: None,
        }
    }

    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let config = AppConfig::load_from_file(&path)?;
        Ok(Self {
            config,
            config_path: Some(path.as_ref().to_path_buf()),
        })
    }

    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&std::path::Path> {
        self.config_path.as_deref()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
