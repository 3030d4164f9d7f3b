//! Configuration validation utilities

use crate::schema::Config;

/// Networks the wallet gateway is known to serve
const KNOWN_NETWORKS: [&str; 6] = [
    "mainnet",
    "granadanet",
    "hangzhounet",
    "ithacanet",
    "ghostnet",
    "sandbox",
];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate complete configuration
    pub fn validate(config: &Config) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::validate_network(config, &mut report);
        Self::validate_contract(config, &mut report);
        Self::validate_confirmation(config, &mut report);
        Self::validate_run(config, &mut report);
        Self::validate_logging(config, &mut report);

        report
    }

    fn validate_network(config: &Config, report: &mut ValidationReport) {
        if config.network.name.is_empty() {
            report.add_error("network.name", "Network name cannot be empty");
        } else if !KNOWN_NETWORKS.contains(&config.network.name.as_str()) {
            report.add_warning(
                "network.name",
                &format!(
                    "Unknown network '{}'. Known networks: {:?}",
                    config.network.name, KNOWN_NETWORKS
                ),
            );
        }

        let url = &config.network.gateway_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            report.add_error("network.gateway_url", "Gateway URL must start with http:// or https://");
        } else if url.starts_with("http://")
            && !url.contains("localhost")
            && !url.contains("127.0.0.1")
        {
            report.add_warning("network.gateway_url", "Remote wallet gateway should use HTTPS");
        }

        if config.network.name == "mainnet" {
            report.add_warning("network.name", "Operations will be signed and submitted on mainnet");
        }
    }

    fn validate_contract(config: &Config, report: &mut ValidationReport) {
        if !types::utils::is_valid_contract_address(&config.contract.address) {
            report.add_error(
                "contract.address",
                &format!("Invalid contract address: {}", config.contract.address),
            );
        }

        if config.contract.app_name.is_empty() {
            report.add_warning("contract.app_name", "Application name is empty, wallets may reject the permission request");
        }
    }

    fn validate_confirmation(config: &Config, report: &mut ValidationReport) {
        let confirmation = &config.confirmation;

        if confirmation.required_confirmations == 0 {
            report.add_error("confirmation.required_confirmations", "At least one confirmation is required");
        } else if confirmation.required_confirmations > 30 {
            report.add_warning("confirmation.required_confirmations", "Waiting for many confirmations makes every step slow");
        }

        if confirmation.poll_interval_ms == 0 {
            report.add_error("confirmation.poll_interval_ms", "Poll interval cannot be 0");
        } else if confirmation.poll_interval_ms < 200 {
            report.add_warning("confirmation.poll_interval_ms", "Poll interval is very low, may overload the gateway");
        }

        if confirmation.max_wait_seconds == 0 {
            report.add_error("confirmation.max_wait_seconds", "Maximum wait cannot be 0");
        } else if confirmation.max_wait_seconds.saturating_mul(1000) < confirmation.poll_interval_ms {
            report.add_warning("confirmation.max_wait_seconds", "Maximum wait is shorter than one poll interval");
        }

        if confirmation.request_timeout_seconds == 0 {
            report.add_error("confirmation.request_timeout_seconds", "Request timeout cannot be 0");
        } else if confirmation.request_timeout_seconds > 300 {
            report.add_warning("confirmation.request_timeout_seconds", "Request timeout is very high");
        }
    }

    fn validate_run(config: &Config, report: &mut ValidationReport) {
        match config.run.deadline_seconds {
            Some(0) => report.add_error("run.deadline_seconds", "Deadline cannot be 0"),
            Some(deadline) if deadline < config.confirmation.max_wait_seconds => {
                report.add_warning(
                    "run.deadline_seconds",
                    "Deadline is shorter than the confirmation wait, runs may end cancelled",
                );
            }
            _ => {}
        }
    }

    fn validate_logging(config: &Config, report: &mut ValidationReport) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            report.add_error("logging.level", &format!("Invalid log level: {}. Valid levels: {:?}", config.logging.level, valid_levels));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&config.logging.format.as_str()) {
            report.add_error("logging.format", &format!("Invalid log format: {}. Valid formats: {:?}", config.logging.format, valid_formats));
        }
    }
}

/// Validation report containing errors and warnings
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// A validation issue (error or warning)
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn summary(&self) -> String {
        format!("Validation: {} errors, {} warnings", self.errors.len(), self.warnings.len())
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}
