//! Carbon Pipeline - command-line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, ConfigLoader, LoggingConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod report;
mod request;

use commands::{CheckConfigArgs, ExampleRequestArgs, RunArgs};

/// Exit code for failures before any operation was submitted
const SETUP_ERROR: u8 = 2;

/// Configuration file used when neither --config nor CONFIG_PATH is set
const DEFAULT_CONFIG_PATH: &str = "carbon-pipeline.yaml";

#[derive(Parser)]
#[command(name = "carbon-pipeline")]
#[command(version, about = "Run ordered contract operations against the carbon marketplace", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $CONFIG_PATH, then ./carbon-pipeline.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit the operations of a request file in order
    Run(RunArgs),
    /// Validate the configuration and print warnings
    CheckConfig(CheckConfigArgs),
    /// Write an example configuration file
    ExampleConfig {
        /// Output path
        path: PathBuf,
    },
    /// Print an example request file for a marketplace workflow
    ExampleRequest(ExampleRequestArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if it exists
    let dotenv_result = dotenv::dotenv();

    let cli = Cli::parse();

    match execute(cli, dotenv_result.is_ok()).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(SETUP_ERROR)
        }
    }
}

async fn execute(cli: Cli, dotenv_loaded: bool) -> Result<ExitCode> {
    // Commands that do not need a configuration
    match &cli.command {
        Command::ExampleConfig { path } => {
            ConfigLoader::create_example(path)?;
            println!("Example configuration written to {}", path.display());
            return Ok(ExitCode::SUCCESS);
        }
        Command::ExampleRequest(args) => return commands::example_request(args),
        _ => {}
    }

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    if dotenv_loaded {
        info!("Loaded environment variables from .env file");
    }
    info!("Starting Carbon Pipeline v{}", env!("CARGO_PKG_VERSION"));
    info!("Network: {}", config.network.name);

    match cli.command {
        Command::Run(args) => commands::run(args, &config).await,
        Command::CheckConfig(args) => commands::check_config(args, &config),
        Command::ExampleConfig { .. } | Command::ExampleRequest(_) => Ok(ExitCode::SUCCESS),
    }
}

/// Resolve and load the configuration
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return ConfigLoader::load(path);
    }

    if let Ok(path) = env::var("CONFIG_PATH") {
        return ConfigLoader::load(path);
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        ConfigLoader::load(DEFAULT_CONFIG_PATH)
    } else {
        ConfigLoader::load_from_env()
    }
}

/// Initialize logging from environment variables, falling back to the configuration
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| logging.level.clone());
    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    // Logs go to stderr so that stdout carries only the run report
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
    }

    info!("Logging initialized");
    info!("Log level: {}", log_level);
    info!("Log format: {}", log_format);

    if log_level == "trace" || log_level == "debug" {
        warn!("Debug/trace logging enabled - gateway polling is verbose");
    }

    Ok(())
}
