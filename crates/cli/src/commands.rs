//! Command handlers

use crate::report::{self, OutputFormat};
use crate::request::RequestFile;
use anyhow::{Context, Result};
use chain_client::{ChainClient, GatewayClient, StubChainClient};
use clap::Args;
use config::{Config, ConfigValidator};
use pipeline::{TransactionPipeline, Workflow};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use types::{CarbonPipelineError, PipelineRequest, PipelineResult};

/// Exit code when the run stopped at a failed operation
const FAILED_AT_INDEX: u8 = 1;

#[derive(Args)]
pub struct RunArgs {
    /// Request file listing the operations (YAML or JSON)
    #[arg(long, short)]
    pub request: PathBuf,

    /// Target contract address, overrides the request file and configuration
    #[arg(long)]
    pub contract: Option<String>,

    /// Cancel the in-flight confirmation after this many seconds
    #[arg(long)]
    pub deadline_seconds: Option<u64>,

    /// Run against an in-memory chain client instead of the wallet gateway
    #[arg(long)]
    pub dry_run: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    /// Exit with an error when warnings are present
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct ExampleRequestArgs {
    /// Workflow: create-project, mint, transfer or bury-carbon
    pub workflow: Workflow,

    /// Target contract address
    #[arg(long, default_value = "KT1A9nbXJcQqbtNiBzhrwqmEccDXawJaRbNW")]
    pub contract: String,
}

/// Submit the operations of a request file
pub async fn run(args: RunArgs, config: &Config) -> Result<ExitCode> {
    let request = RequestFile::load(&args.request)?
        .into_request(args.contract.as_deref(), &config.contract.address);

    info!(
        operations = request.len(),
        contract = %request.contract,
        dry_run = args.dry_run,
        "Request loaded from {}",
        args.request.display()
    );

    let report = ConfigValidator::validate(config);
    for issue in &report.warnings {
        warn!(field = %issue.field, "{}", issue.message);
    }

    let pipeline = TransactionPipeline::new();
    let deadline = args
        .deadline_seconds
        .map(Duration::from_secs)
        .or_else(|| config.run.deadline());
    let watcher = spawn_cancellation_watcher(pipeline.cancellation_token(), deadline);

    let result = if args.dry_run {
        execute(&pipeline, &StubChainClient::new(), &request).await
    } else {
        let client = GatewayClient::new(config.gateway_settings())
            .map_err(CarbonPipelineError::from)
            .context("Failed to create wallet gateway client")?;
        let wallet = client
            .request_permissions(&config.contract.app_name, &config.network.name)
            .await
            .map_err(CarbonPipelineError::from)
            .context("Wallet permission request failed")?;
        info!("Your address: {}", wallet.address);
        execute(&pipeline, &client, &request).await
    };
    watcher.abort();

    let result = result?;
    println!("{}", report::render(&result, args.output)?);

    if result.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(FAILED_AT_INDEX))
    }
}

async fn execute<C: ChainClient>(
    pipeline: &TransactionPipeline,
    client: &C,
    request: &PipelineRequest,
) -> Result<PipelineResult> {
    pipeline
        .run(client, request)
        .await
        .map_err(CarbonPipelineError::from)
        .context("Pipeline could not start")
}

/// Cancel the pipeline on Ctrl-C or once the deadline elapses
fn spawn_cancellation_watcher(
    token: CancellationToken,
    deadline: Option<Duration>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let deadline_elapsed = async {
            match deadline {
                Some(deadline) => tokio::time::sleep(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = token.cancelled() => {}
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    info!("Shutdown signal received, cancelling pipeline");
                    token.cancel();
                }
                Err(e) => warn!("Failed to install Ctrl-C handler: {}", e),
            },
            _ = deadline_elapsed => {
                warn!(
                    deadline_seconds = deadline.map(|d| d.as_secs()),
                    "Deadline elapsed, cancelling pipeline"
                );
                token.cancel();
            }
        }
    })
}

/// Validate the configuration and print the report
pub fn check_config(args: CheckConfigArgs, config: &Config) -> Result<ExitCode> {
    let report = ConfigValidator::validate(config);

    for issue in &report.errors {
        println!("error   {}: {}", issue.field, issue.message);
    }
    for issue in &report.warnings {
        println!("warning {}: {}", issue.field, issue.message);
    }
    println!("{}", report.summary());

    if !report.is_valid() || (args.strict && report.has_warnings()) {
        Ok(ExitCode::from(crate::SETUP_ERROR))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Print an example request for a workflow
pub fn example_request(args: &ExampleRequestArgs) -> Result<ExitCode> {
    let request = args
        .workflow
        .example(&args.contract)
        .with_context(|| format!("Failed to build example for {}", args.workflow))?;

    let yaml = serde_yaml::to_string(&RequestFile::from(request))
        .context("Failed to serialize example request")?;
    print!("{}", yaml);
    Ok(ExitCode::SUCCESS)
}
