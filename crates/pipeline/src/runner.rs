//! Sequential transaction pipeline

use chain_client::{ChainClient, ContractHandle};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use types::utils::{generate_run_id, sanitize_for_logging};
use types::{
    OperationOutcome, PipelineError, PipelineRequest, PipelineResult, PipelineStatus, RunId,
};

/// Runs the operations of a request one after another against a single
/// contract, stopping at the first operation that does not succeed.
///
/// Each operation is confirmed before the next one is submitted, since later
/// calls may depend on state written by earlier ones. Failed operations are
/// neither retried nor rolled back.
#[derive(Debug, Clone, Default)]
pub struct TransactionPipeline {
    cancel: CancellationToken,
}

impl TransactionPipeline {
    /// Create a pipeline that is never cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline cancelled through the given token
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Token that cancels the in-flight confirmation when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run a request to completion
    pub async fn run<C: ChainClient>(
        &self,
        client: &C,
        request: &PipelineRequest,
    ) -> Result<PipelineResult, PipelineError> {
        if request.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }

        let run_id = generate_run_id();
        let span = tracing::info_span!(
            "pipeline_run",
            run_id = %run_id,
            client = client.name(),
            contract = %sanitize_for_logging(&request.contract),
        );

        self.execute(client, request, run_id).instrument(span).await
    }

    async fn execute<C: ChainClient>(
        &self,
        client: &C,
        request: &PipelineRequest,
        run_id: RunId,
    ) -> Result<PipelineResult, PipelineError> {
        let started_at = Utc::now();
        tracing::info!(operations = request.len(), "Pipeline started");

        let contract = client
            .resolve_contract(&request.contract)
            .await
            .map_err(|e| e.into_pipeline_error(&request.contract))?;

        let mut outcomes = Vec::with_capacity(request.len());
        let mut status = PipelineStatus::AllSucceeded;

        for (index, descriptor) in request.operations.iter().enumerate() {
            let name = descriptor.name.as_str();

            if self.cancel.is_cancelled() {
                tracing::warn!(index, entrypoint = name, "Pipeline cancelled before submission");
                outcomes.push(OperationOutcome::cancelled(index, name, None));
                status = PipelineStatus::FailedAt { index };
                break;
            }

            let pending = match contract.invoke(name, &descriptor.args).await {
                Ok(pending) => pending,
                Err(e) => {
                    tracing::warn!(index, entrypoint = name, error = %e, "Operation rejected");
                    outcomes.push(OperationOutcome::rejected(index, name, e.to_string()));
                    status = PipelineStatus::FailedAt { index };
                    break;
                }
            };

            tracing::info!(
                index,
                entrypoint = name,
                op_hash = %pending.op_hash,
                "Operation submitted"
            );

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    OperationOutcome::cancelled(index, name, Some(pending.op_hash.clone()))
                }
                confirmation = client.await_confirmation(&pending) => match confirmation {
                    Ok(confirmation) => OperationOutcome::confirmed(index, &pending, confirmation),
                    Err(e) => OperationOutcome::unconfirmed(index, &pending, e.to_string()),
                },
            };

            let succeeded = outcome.is_success();
            if succeeded {
                if let Some(block) = &outcome.block {
                    tracing::info!(
                        index,
                        entrypoint = name,
                        block_level = block.level,
                        chain_id = %block.chain_id,
                        "Operation confirmed"
                    );
                }
            } else {
                tracing::warn!(
                    index,
                    entrypoint = name,
                    status = ?outcome.status,
                    error = outcome.error.as_ref().map(|e| e.message.as_str()).unwrap_or(""),
                    "Operation did not succeed"
                );
            }

            outcomes.push(outcome);
            if !succeeded {
                status = PipelineStatus::FailedAt { index };
                break;
            }
        }

        let result = PipelineResult {
            run_id,
            contract: contract.address().to_string(),
            outcomes,
            status,
            started_at,
            finished_at: Utc::now(),
        };

        match result.status {
            PipelineStatus::AllSucceeded => tracing::info!(
                operations = result.outcomes.len(),
                duration_ms = result.duration_ms(),
                "Pipeline completed"
            ),
            PipelineStatus::FailedAt { index } => tracing::warn!(
                failed_index = index,
                duration_ms = result.duration_ms(),
                "Pipeline aborted"
            ),
        }

        Ok(result)
    }
}

/// Run a request with a pipeline that is never cancelled
pub async fn run<C: ChainClient>(
    client: &C,
    request: &PipelineRequest,
) -> Result<PipelineResult, PipelineError> {
    TransactionPipeline::new().run(client, request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows;
    use chain_client::{StubBehavior, StubChainClient};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};
    use types::{FailureKind, MintEntry, OperationDescriptor, OperationStatus};

    const CONTRACT: &str = "KT1A9nbXJcQqbtNiBzhrwqmEccDXawJaRbNW";
    const OWNER: &str = "tz1T1buQd895VYtg34W3swFaVpT6A4XpW5i7";

    fn mint_request() -> PipelineRequest {
        workflows::mint(
            CONTRACT,
            vec![MintEntry {
                owner: OWNER.to_string(),
                token_id: 0,
                amount: 100,
            }],
        )
        .unwrap()
    }

    fn bury_request() -> PipelineRequest {
        workflows::bury_carbon(CONTRACT, OWNER, CONTRACT, 0, 10).unwrap()
    }

    #[tokio::test]
    async fn test_single_mint_succeeds() {
        let client = StubChainClient::new();

        let result = assert_ok!(run(&client, &mint_request()).await);

        assert!(result.is_success());
        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].operation_name, "mint");
        assert!(result.outcomes[0].op_hash.is_some());
        assert!(result.outcomes[0].block.is_some());
        assert_eq!(result.contract, CONTRACT);
    }

    #[tokio::test]
    async fn test_all_succeed_preserves_order() {
        let client = StubChainClient::new();
        let request = bury_request();

        let result = assert_ok!(run(&client, &request).await);

        assert_eq!(result.status, PipelineStatus::AllSucceeded);
        let names: Vec<_> = result.outcomes.iter().map(|o| o.operation_name.as_str()).collect();
        assert_eq!(names, vec!["add_operator", "buryCarbon", "remove_operator"]);
        let indices: Vec<_> = result.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(client.invocations(), names);
    }

    #[tokio::test]
    async fn test_failure_stops_pipeline() {
        let client = StubChainClient::builder()
            .behavior("buryCarbon", StubBehavior::Fail("FA2_INSUFFICIENT_BALANCE".to_string()))
            .build();

        let result = assert_ok!(run(&client, &bury_request()).await);

        assert_eq!(result.status, PipelineStatus::FailedAt { index: 1 });
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.outcomes[0].status, OperationStatus::Succeeded);
        assert_eq!(result.outcomes[1].status, OperationStatus::Failed);
        let error = result.outcomes[1].error.as_ref().unwrap();
        assert_eq!(error.kind, FailureKind::Confirmation);
        assert_eq!(error.message, "FA2_INSUFFICIENT_BALANCE");
        assert_eq!(client.invocations(), vec!["add_operator", "buryCarbon"]);
        assert_eq!(result.failed_outcome().unwrap().operation_name, "buryCarbon");
    }

    #[tokio::test]
    async fn test_failure_at_every_index() {
        let request = PipelineRequest::new(
            CONTRACT,
            ["step_a", "step_b", "step_c", "step_d"]
                .iter()
                .map(|name| OperationDescriptor::new(*name, vec![]))
                .collect(),
        );

        for k in 0..request.len() {
            let failing = request.operations[k].name.clone();
            let mut builder = StubChainClient::builder();
            for op in &request.operations {
                builder = builder.behavior(&op.name, StubBehavior::Succeed);
            }
            let client = builder
                .behavior(&failing, StubBehavior::Fail("rejected".to_string()))
                .build();

            let result = assert_ok!(run(&client, &request).await);

            assert_eq!(result.failed_index(), Some(k));
            assert_eq!(result.outcomes.len(), k + 1);
            assert_eq!(client.invocations().len(), k + 1);
        }
    }

    #[tokio::test]
    async fn test_invocation_error_is_recorded() {
        let client = StubChainClient::builder()
            .behavior("mint", StubBehavior::Reject("contract paused".to_string()))
            .build();
        let mut request = mint_request();
        request.operations.push(request.operations[0].clone());

        let result = assert_ok!(run(&client, &request).await);

        assert_eq!(result.failed_index(), Some(0));
        assert_eq!(result.outcomes.len(), 1);
        let outcome = &result.outcomes[0];
        assert!(outcome.op_hash.is_none());
        assert_eq!(outcome.error.as_ref().unwrap().kind, FailureKind::Invocation);
        assert!(client.log().confirmations.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_arguments_abort_run() {
        let client = StubChainClient::new();
        let request = PipelineRequest::new(
            CONTRACT,
            vec![OperationDescriptor::new("mint", vec![serde_json::json!("...")])],
        );

        let result = assert_ok!(run(&client, &request).await);
        assert_eq!(result.outcomes[0].status, OperationStatus::Failed);
        assert_eq!(result.failed_index(), Some(0));
    }

    #[tokio::test]
    async fn test_empty_pipeline() {
        let client = StubChainClient::new();
        let request = PipelineRequest::new(CONTRACT, vec![]);

        let err = assert_err!(run(&client, &request).await);

        assert!(matches!(err, PipelineError::EmptyPipeline));
        assert!(client.resolutions().is_empty());
        assert!(client.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_contract_address() {
        let client = StubChainClient::new();
        let mut request = mint_request();
        request.contract = "KT1invalid".to_string();

        let err = assert_err!(run(&client, &request).await);

        assert!(matches!(err, PipelineError::ContractResolution { .. }));
        assert_eq!(client.resolutions(), vec!["KT1invalid"]);
        assert!(client.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_in_flight_confirmation() {
        let client = StubChainClient::builder()
            .behavior("mint", StubBehavior::Hang)
            .build();
        let pipeline = TransactionPipeline::new();
        let token = pipeline.cancellation_token();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result = assert_ok!(pipeline.run(&client, &mint_request()).await);

        assert_eq!(result.status, PipelineStatus::FailedAt { index: 0 });
        assert_eq!(result.outcomes.len(), 1);
        let outcome = &result.outcomes[0];
        assert_eq!(outcome.status, OperationStatus::Cancelled);
        assert!(outcome.op_hash.is_some());
        assert_eq!(outcome.error.as_ref().unwrap().kind, FailureKind::Cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_submits_nothing() {
        let client = StubChainClient::new();
        let token = CancellationToken::new();
        token.cancel();

        let result = assert_ok!(
            TransactionPipeline::with_cancellation(token)
                .run(&client, &bury_request())
                .await
        );

        assert_eq!(result.failed_index(), Some(0));
        assert_eq!(result.outcomes[0].status, OperationStatus::Cancelled);
        assert!(client.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_independent_runs_in_parallel() {
        let ok_client = StubChainClient::new();
        let failing_client = StubChainClient::builder()
            .behavior("add_operator", StubBehavior::Fail("FA2_NOT_OWNER".to_string()))
            .build();
        let request = bury_request();

        let (ok, failed) = tokio::join!(run(&ok_client, &request), run(&failing_client, &request));

        let ok = assert_ok!(ok);
        let failed = assert_ok!(failed);
        assert!(ok.is_success());
        assert_eq!(failed.failed_index(), Some(0));
        assert_ne!(ok.run_id, failed.run_id);
    }
}
