//! Configuration loader implementation

use crate::schema::Config;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use std::path::Path;
use types::ConfigError;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CARBON_PIPELINE_";

/// Configuration loader that handles YAML files and environment variables
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Config> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Err(ConfigError::FileNotFound {
                path: config_path.display().to_string(),
            }
            .into());
        }

        let config: Config = Self::base()
            .merge(Yaml::file(config_path))
            // Nested keys use a double underscore: CARBON_PIPELINE_NETWORK__GATEWAY_URL
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to parse configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from defaults and environment variables only
    pub fn load_from_env() -> Result<Config> {
        let config: Config = Self::base()
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to parse configuration from environment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from string (for testing)
    pub fn load_from_str(yaml_content: &str) -> Result<Config> {
        let config: Config = Self::base()
            .merge(Yaml::string(yaml_content))
            .extract()
            .context("Failed to parse configuration from string")?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    /// Validate configuration
    fn validate(config: &Config) -> Result<()> {
        if config.network.name.is_empty() {
            return Err(ConfigError::MissingField {
                field: "network.name".to_string(),
            }
            .into());
        }

        let gateway_url = &config.network.gateway_url;
        if !gateway_url.starts_with("http://") && !gateway_url.starts_with("https://") {
            return Err(ConfigError::ValidationError {
                field: "network.gateway_url".to_string(),
                message: format!("Invalid gateway URL format: {}", gateway_url),
            }
            .into());
        }

        if !types::utils::is_valid_contract_address(&config.contract.address) {
            return Err(ConfigError::InvalidValue {
                field: "contract.address".to_string(),
                value: config.contract.address.clone(),
            }
            .into());
        }

        if config.confirmation.required_confirmations == 0 {
            return Err(ConfigError::ValidationError {
                field: "confirmation.required_confirmations".to_string(),
                message: "At least one confirmation is required".to_string(),
            }
            .into());
        }

        if config.confirmation.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError {
                field: "confirmation.poll_interval_ms".to_string(),
                message: "Poll interval must be greater than 0".to_string(),
            }
            .into());
        }

        if config.confirmation.max_wait_seconds == 0 {
            return Err(ConfigError::ValidationError {
                field: "confirmation.max_wait_seconds".to_string(),
                message: "Maximum wait must be greater than 0".to_string(),
            }
            .into());
        }

        if config.confirmation.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                field: "confirmation.request_timeout_seconds".to_string(),
                message: "Request timeout must be greater than 0".to_string(),
            }
            .into());
        }

        if config.run.deadline_seconds == Some(0) {
            return Err(ConfigError::ValidationError {
                field: "run.deadline_seconds".to_string(),
                message: "Deadline must be greater than 0 when set".to_string(),
            }
            .into());
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logging.level".to_string(),
                message: format!(
                    "Invalid log level: {}. Valid levels: {:?}",
                    config.logging.level, valid_log_levels
                ),
            }
            .into());
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logging.format".to_string(),
                message: format!(
                    "Invalid log format: {}. Valid formats: {:?}",
                    config.logging.format, valid_log_formats
                ),
            }
            .into());
        }

        Ok(())
    }

    /// Get default configuration
    pub fn default() -> Config {
        Config::default()
    }

    /// Create example configuration file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let yaml_content = serde_yaml::to_string(&config)
            .context("Failed to serialize default configuration")?;

        std::fs::write(path.as_ref(), yaml_content)
            .context("Failed to write example configuration file")?;

        Ok(())
    }
}
