//! Run report rendering

use anyhow::{Context, Result};
use clap::ValueEnum;
use types::utils::sanitize_for_logging;
use types::{OperationOutcome, OperationStatus, PipelineResult, PipelineStatus};

/// Report format written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Render a pipeline result
pub fn render(result: &PipelineResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).context("Failed to serialize pipeline result")
        }
        OutputFormat::Text => Ok(render_text(result)),
    }
}

fn render_text(result: &PipelineResult) -> String {
    let mut lines = vec![format!("Run {} against {}", result.run_id, result.contract)];
    lines.extend(result.outcomes.iter().map(render_outcome));

    let summary = match result.status {
        PipelineStatus::AllSucceeded => format!(
            "All {} operations processed in {} ms",
            result.outcomes.len(),
            result.duration_ms()
        ),
        PipelineStatus::FailedAt { index } => {
            format!("Pipeline stopped at operation {}; later operations were not submitted", index)
        }
    };
    lines.push(summary);
    lines.join("\n")
}

fn render_outcome(outcome: &OperationOutcome) -> String {
    let hash = outcome
        .op_hash
        .as_deref()
        .map(sanitize_for_logging)
        .unwrap_or_else(|| "-".to_string());

    let detail = match (outcome.status, &outcome.block, &outcome.error) {
        (OperationStatus::Succeeded, Some(block), _) => {
            format!("block {} chain {}", block.level, block.chain_id)
        }
        (_, _, Some(error)) => error.message.clone(),
        _ => String::new(),
    };

    let status = match outcome.status {
        OperationStatus::Succeeded => "succeeded",
        OperationStatus::Failed => "FAILED",
        OperationStatus::Cancelled => "CANCELLED",
    };

    format!(
        "  [{}] {:<16} {:<16} {:<9} {}",
        outcome.index, outcome.operation_name, hash, status, detail
    )
    .trim_end()
    .to_string()
}
