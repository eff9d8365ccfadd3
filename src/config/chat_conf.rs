use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info, warn};

use crate::config::ConfigError;

/// Configuration for the chat assistant and its upstream completion API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Chat-completions endpoint URL
    pub api_url: String,
    /// API key for the completion provider; empty disables the assistant
    pub api_key: String,
    /// Model identifier sent to the provider
    pub model: String,
    /// Maximum number of prior conversation turns forwarded upstream
    pub max_history: usize,
    /// Per-IP request quota for the rolling hour window
    pub requests_per_hour: u32,
}

impl ChatConfig {
    /// Create ChatConfig from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading chat configuration from environment variables");

        let api_url = env::var("CHAT_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
        debug!("Chat API URL: {}", api_url);

        let api_key = env::var("CHAT_API_KEY").unwrap_or_else(|_| {
            warn!("CHAT_API_KEY not set, the chat assistant will reject requests");
            String::new()
        });

        let model = env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        debug!("Chat model: {}", model);

        let max_history = env::var("CHAT_MAX_HISTORY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        debug!("Chat max history: {}", max_history);

        let requests_per_hour = env::var("CHAT_REQUESTS_PER_HOUR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        debug!("Chat requests per hour: {}", requests_per_hour);

        let config = ChatConfig {
            api_url,
            api_key,
            model,
            max_history,
            requests_per_hour,
        };

        config.validate()?;
        info!("Chat configuration loaded successfully");
        Ok(config)
    }

    /// Create ChatConfig for testing
    pub fn from_test_env() -> Self {
        ChatConfig {
            api_url: "http://localhost:9999/v1/chat/completions".to_string(),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            max_history: 10,
            requests_per_hour: 10,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.is_empty() {
            return Err(ConfigError::ValidationError("Chat API URL cannot be empty".to_string()));
        }
        if self.model.is_empty() {
            return Err(ConfigError::ValidationError("Chat model cannot be empty".to_string()));
        }
        if self.requests_per_hour == 0 {
            return Err(ConfigError::ValidationError(
                "Chat requests per hour cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_history: 10,
            requests_per_hour: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ChatConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_quota() {
        let mut config = ChatConfig::from_test_env();
        config.requests_per_hour = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_model() {
        let mut config = ChatConfig::from_test_env();
        config.model = "".to_string();
        assert!(config.validate().is_err());
    }
}
