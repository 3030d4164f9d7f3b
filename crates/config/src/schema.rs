//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::time::Duration;
use types::GatewaySettings;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Network and wallet gateway configuration
    #[serde(default)]
    pub network: NetworkConfig,
    /// Target contract configuration
    #[serde(default)]
    pub contract: ContractConfig,
    /// Confirmation polling configuration
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    /// Pipeline run configuration
    #[serde(default)]
    pub run: RunConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Preferred network name (mainnet, granadanet, hangzhounet, ...)
    #[serde(default = "default_network")]
    pub name: String,
    /// Wallet gateway URL
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
}

/// Target contract configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Default target contract address
    #[serde(default = "default_contract_address")]
    pub address: String,
    /// Application name presented to the wallet
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

/// Confirmation polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Blocks required on top of the including block
    #[serde(default = "default_required_confirmations")]
    pub required_confirmations: u32,
    /// Interval between status polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up waiting for a confirmation after this many seconds
    #[serde(default = "default_max_wait_seconds")]
    pub max_wait_seconds: u64,
    /// Timeout for a single gateway request in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/// Pipeline run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Cancel the in-flight confirmation once this deadline elapses
    pub deadline_seconds: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_network() -> String {
    "granadanet".to_string()
}

fn default_gateway_url() -> String {
    "http://localhost:8732".to_string()
}

fn default_contract_address() -> String {
    "KT1A9nbXJcQqbtNiBzhrwqmEccDXawJaRbNW".to_string()
}

fn default_app_name() -> String {
    "CarbonMarketplace".to_string()
}

fn default_required_confirmations() -> u32 {
    1
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_max_wait_seconds() -> u64 {
    600 // 10 minutes
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Wallet gateway settings derived from network and confirmation config
    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            url: self.network.gateway_url.clone(),
            request_timeout: self.confirmation.request_timeout(),
            poll_interval: self.confirmation.poll_interval(),
            max_wait: self.confirmation.max_wait(),
            required_confirmations: self.confirmation.required_confirmations,
        }
    }
}

impl ConfirmationConfig {
    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Maximum wait as a duration
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_seconds)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl RunConfig {
    /// Deadline as a duration
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_seconds.map(Duration::from_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: default_network(),
            gateway_url: default_gateway_url(),
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: default_contract_address(),
            app_name: default_app_name(),
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            required_confirmations: default_required_confirmations(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_seconds: default_max_wait_seconds(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
