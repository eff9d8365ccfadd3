use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::ConfigError;

/// Configuration for the reference-number counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Path of the JSON file holding the next counter value
    pub counter_path: PathBuf,
    /// First number issued when the counter file does not exist yet
    pub start_number: u64,
}

impl ReferenceConfig {
    /// Create ReferenceConfig from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading reference configuration from environment variables");

        let counter_path = env::var("REFERENCE_COUNTER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/reference-counter.json"));
        debug!("Reference counter path: {}", counter_path.display());

        let start_number = env::var("REFERENCE_START_NUMBER")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7000);
        debug!("Reference start number: {}", start_number);

        let config = ReferenceConfig { counter_path, start_number };
        config.validate()?;
        info!("Reference configuration loaded successfully");
        Ok(config)
    }

    /// Create ReferenceConfig for testing
    pub fn from_test_env() -> Self {
        ReferenceConfig {
            counter_path: PathBuf::from("target/test-reference-counter.json"),
            start_number: 7000,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.counter_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "Reference counter path cannot be empty".to_string(),
            ));
        }
        if self.start_number == 0 {
            return Err(ConfigError::ValidationError(
                "Reference start number cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        ReferenceConfig {
            counter_path: PathBuf::from("data/reference-counter.json"),
            start_number: 7000,
        }
    }
}
