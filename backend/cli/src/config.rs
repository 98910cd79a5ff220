use std::collections::HashMap;
use std::time::Duration;

use whiteboard_agent::{DriverConfig, ModelConfig};

/// Whiteboard server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// OpenAI API key
    pub openai_api_key: Option<String>,
    /// OpenAI API base URL
    pub openai_base_url: String,
    /// Model the assistant runs on
    pub model: String,
    /// Delay between run status checks
    pub poll_interval_ms: u64,
    /// Status checks before a run is abandoned; unset polls forever
    pub max_polls: Option<u32>,
    /// Directory for rolling JSON logs
    pub log_dir: Option<String>,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            poll_interval_ms: 1000,
            max_polls: None,
            log_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Load configuration from a provided map (useful for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let var = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();
        let defaults = Self::default();

        Self {
            bind_address: var("WHITEBOARD_BIND").unwrap_or(defaults.bind_address),
            port: var("WHITEBOARD_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            model: var("WHITEBOARD_MODEL").unwrap_or(defaults.model),
            poll_interval_ms: var("WHITEBOARD_POLL_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.poll_interval_ms),
            max_polls: var("WHITEBOARD_MAX_POLLS").and_then(|v| v.parse().ok()),
            log_dir: var("WHITEBOARD_LOG_DIR"),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_polls: self.max_polls,
        }
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            model_name: self.model.clone(),
            ..ModelConfig::default()
        }
    }
}
