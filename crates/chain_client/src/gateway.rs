//! HTTP client for a wallet gateway
//!
//! The wallet gateway is the remote wallet-and-SDK service that holds the
//! signing keys. It resolves contracts, signs and injects operations, and
//! reports their inclusion status.

use crate::traits::{ChainClient, ContractHandle};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::time::{timeout, Instant, MissedTickBehavior};
use types::utils::{is_valid_contract_address, is_valid_operation_hash, sanitize_for_logging};
use types::{
    ChainError, Confirmation, EntrypointCall, EntrypointsResponse, GatewayOperationStatus,
    GatewaySettings, OperationDescriptor, OperationStatusResponse, PendingOperation,
    SubmitOperationRequest, SubmitOperationResponse, WalletInfo,
};

/// HTTP client for the wallet gateway
#[derive(Debug, Clone)]
pub struct GatewayClient {
    settings: GatewaySettings,
    http_client: Client,
}

/// Contract resolved through the wallet gateway
#[derive(Debug, Clone)]
pub struct GatewayContract {
    address: String,
    entrypoints: Vec<String>,
    client: GatewayClient,
}

/// Failure of a single gateway request
#[derive(Error, Debug)]
enum RequestFailure {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {}", .0.as_u16())]
    EmptyStatus(StatusCode),

    #[error("HTTP {}: {}", .0.as_u16(), .1)]
    Status(StatusCode, String),

    #[error("invalid response: {0}")]
    Decode(String),
}

impl GatewayClient {
    /// Create a new gateway client
    pub fn new(settings: GatewaySettings) -> Result<Self, ChainError> {
        let http_client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("carbon-pipeline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChainError::Gateway(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            http_client,
        })
    }

    /// Get gateway settings
    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Active wallet account and network, requested on behalf of `app_name`
    pub async fn wallet_info(&self, app_name: &str) -> Result<WalletInfo, ChainError> {
        let request = self
            .http_client
            .get(self.endpoint("wallet"))
            .query(&[("name", app_name)]);
        self.send_json(request)
            .await
            .map_err(|e| ChainError::Gateway(format!("wallet info: {}", e)))
    }

    /// Ask the wallet for permissions as `app_name`, check that it is
    /// connected to the preferred network and return the signing account
    pub async fn request_permissions(
        &self,
        app_name: &str,
        network: &str,
    ) -> Result<WalletInfo, ChainError> {
        let wallet = self.wallet_info(app_name).await?;

        if wallet.network != network {
            return Err(ChainError::Gateway(format!(
                "wallet is connected to {} but {} was requested",
                wallet.network, network
            )));
        }

        tracing::info!(
            app_name,
            address = %wallet.address,
            network = %wallet.network,
            "Wallet permissions granted"
        );
        Ok(wallet)
    }

    /// Current status of a submitted operation
    pub async fn operation_status(&self, op_hash: &str) -> Result<OperationStatusResponse, ChainError> {
        let request = self
            .http_client
            .get(self.endpoint(&format!("operations/{}", op_hash)));
        self.send_json(request).await.map_err(|e| ChainError::Confirmation {
            op_hash: op_hash.to_string(),
            reason: e.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.url.trim_end_matches('/'), path)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RequestFailure> {
        let response = timeout(self.settings.request_timeout, request.send())
            .await
            .map_err(|_| RequestFailure::Timeout)?
            .map_err(|e| RequestFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.is_empty() {
                return Err(RequestFailure::EmptyStatus(status));
            }
            return Err(RequestFailure::Status(status, body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RequestFailure::Decode(e.to_string()))
    }

    async fn fetch_entrypoints(&self, address: &str) -> Result<Vec<String>, ChainError> {
        let request = self
            .http_client
            .get(self.endpoint(&format!("contracts/{}/entrypoints", address)));

        match self.send_json::<EntrypointsResponse>(request).await {
            Ok(response) => Ok(response.entrypoints.into_keys().collect()),
            Err(RequestFailure::EmptyStatus(StatusCode::NOT_FOUND))
            | Err(RequestFailure::Status(StatusCode::NOT_FOUND, _)) => {
                Err(ChainError::ContractResolution {
                    address: address.to_string(),
                    reason: "contract not found".to_string(),
                })
            }
            Err(e) => Err(ChainError::ContractResolution {
                address: address.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn submit(&self, request: &SubmitOperationRequest) -> Result<PendingOperation, ChainError> {
        let invocation_error = |reason: String| ChainError::Invocation {
            entrypoint: request.entrypoint.clone(),
            reason,
        };

        let builder = self.http_client.post(self.endpoint("operations")).json(request);
        let response: SubmitOperationResponse = self
            .send_json(builder)
            .await
            .map_err(|e| invocation_error(e.to_string()))?;

        if !is_valid_operation_hash(&response.op_hash) {
            return Err(invocation_error(format!(
                "gateway returned an invalid operation hash: {}",
                response.op_hash
            )));
        }

        Ok(PendingOperation::new(response.op_hash, request.entrypoint.clone()))
    }
}

#[async_trait]
impl ChainClient for GatewayClient {
    type Contract = GatewayContract;

    async fn resolve_contract(&self, address: &str) -> Result<GatewayContract, ChainError> {
        if !is_valid_contract_address(address) {
            return Err(ChainError::ContractResolution {
                address: address.to_string(),
                reason: "not a valid KT1 contract address".to_string(),
            });
        }

        let entrypoints = self.fetch_entrypoints(address).await?;
        tracing::info!(
            contract = %sanitize_for_logging(address),
            entrypoints = entrypoints.len(),
            "Resolved contract"
        );

        Ok(GatewayContract {
            address: address.to_string(),
            entrypoints,
            client: self.clone(),
        })
    }

    async fn await_confirmation(
        &self,
        pending: &PendingOperation,
    ) -> Result<Confirmation, ChainError> {
        let op_hash = pending.op_hash.as_str();
        // No deadline when the wait is too long to represent
        let deadline = Instant::now().checked_add(self.settings.max_wait);
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_error: Option<String> = None;

        loop {
            ticker.tick().await;

            match self.operation_status(op_hash).await {
                Ok(status) if !status.status.is_terminal() => {
                    tracing::debug!(op_hash = %sanitize_for_logging(op_hash), "Operation pending");
                }
                Ok(status) if status.status == GatewayOperationStatus::Applied => {
                    if status.confirmations >= self.settings.required_confirmations {
                        let block = status.block.ok_or_else(|| ChainError::Confirmation {
                            op_hash: op_hash.to_string(),
                            reason: "applied operation reported without a block".to_string(),
                        })?;
                        return Ok(Confirmation::Applied { block });
                    }
                    tracing::debug!(
                        op_hash = %sanitize_for_logging(op_hash),
                        confirmations = status.confirmations,
                        required = self.settings.required_confirmations,
                        "Waiting for more confirmations"
                    );
                }
                Ok(status) => {
                    return Ok(Confirmation::Failed {
                        reason: status.error_summary(),
                        block: status.block,
                    });
                }
                // The gateway may not know a freshly injected operation yet
                Err(e) => {
                    tracing::warn!(op_hash = %sanitize_for_logging(op_hash), error = %e, "Status poll failed");
                    last_error = Some(e.to_string());
                }
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                let mut reason = format!(
                    "not confirmed within {}s",
                    self.settings.max_wait.as_secs_f64()
                );
                if let Some(e) = last_error {
                    reason.push_str(&format!(" (last error: {})", e));
                }
                return Err(ChainError::Confirmation {
                    op_hash: op_hash.to_string(),
                    reason,
                });
            }
        }
    }

    fn name(&self) -> &str {
        "wallet-gateway"
    }
}

#[async_trait]
impl ContractHandle for GatewayContract {
    fn address(&self) -> &str {
        &self.address
    }

    fn entrypoints(&self) -> &[String] {
        &self.entrypoints
    }

    async fn invoke(&self, entrypoint: &str, args: &[Value]) -> Result<PendingOperation, ChainError> {
        if !self.has_entrypoint(entrypoint) {
            return Err(ChainError::Invocation {
                entrypoint: entrypoint.to_string(),
                reason: format!("contract {} has no such entrypoint", self.address),
            });
        }

        if EntrypointCall::is_known(entrypoint) {
            let descriptor = OperationDescriptor::new(entrypoint, args.to_vec());
            EntrypointCall::from_descriptor(&descriptor)
                .map_err(|e| e.into_invocation_error(entrypoint))?;
        }

        let request = SubmitOperationRequest {
            contract: self.address.clone(),
            entrypoint: entrypoint.to_string(),
            args: args.to_vec(),
        };

        let pending = self.client.submit(&request).await?;
        tracing::info!(
            entrypoint = %entrypoint,
            op_hash = %pending.op_hash,
            "Operation injected"
        );
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{
        matchers::{body_partial_json, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    const CONTRACT: &str = "KT1A9nbXJcQqbtNiBzhrwqmEccDXawJaRbNW";
    const OWNER: &str = "tz1T1buQd895VYtg34W3swFaVpT6A4XpW5i7";
    const OP_HASH: &str = "ooYQ2xNhG9wBdE6K8ZxV2y9h7jQJ1nT3v5bX4mC6sR8dF2gH1kL";

    fn client(server: &MockServer) -> GatewayClient {
        GatewayClient::new(GatewaySettings {
            url: server.uri(),
            request_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
            max_wait: Duration::from_millis(500),
            required_confirmations: 1,
        })
        .unwrap()
    }

    async fn mount_entrypoints(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(format!("/contracts/{}/entrypoints", CONTRACT)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entrypoints": {
                    "mint": { "prim": "list" },
                    "transfer": { "prim": "list" },
                    "setAdmin": { "prim": "address" }
                }
            })))
            .mount(server)
            .await;
    }

    fn status_body(status: &str, confirmations: u32) -> serde_json::Value {
        json!({
            "status": status,
            "confirmations": confirmations,
            "block": { "level": 123456, "chainId": "NetXxkAx4woPLyu", "hash": "BLockHash" }
        })
    }

    #[tokio::test]
    async fn test_resolve_contract() {
        let server = MockServer::start().await;
        mount_entrypoints(&server).await;

        let contract = client(&server).resolve_contract(CONTRACT).await.unwrap();
        assert_eq!(contract.address(), CONTRACT);
        assert!(contract.has_entrypoint("mint"));
        assert!(!contract.has_entrypoint("buryCarbon"));
    }

    #[tokio::test]
    async fn test_resolve_invalid_address_skips_network() {
        let server = MockServer::start().await;

        let result = client(&server).resolve_contract("KT1notanaddress").await;
        assert!(matches!(result, Err(ChainError::ContractResolution { .. })));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_unknown_contract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        match client(&server).resolve_contract(CONTRACT).await {
            Err(ChainError::ContractResolution { reason, .. }) => {
                assert_eq!(reason, "contract not found");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invoke_submits_operation() {
        let server = MockServer::start().await;
        mount_entrypoints(&server).await;
        Mock::given(method("POST"))
            .and(path("/operations"))
            .and(body_partial_json(json!({ "contract": CONTRACT, "entrypoint": "mint" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "opHash": OP_HASH })))
            .expect(1)
            .mount(&server)
            .await;

        let contract = client(&server).resolve_contract(CONTRACT).await.unwrap();
        let args = vec![json!({ "owner": OWNER, "token_id": 0, "amount": 100 })];
        let pending = contract.invoke("mint", &args).await.unwrap();

        assert_eq!(pending.op_hash, OP_HASH);
        assert_eq!(pending.entrypoint, "mint");
    }

    #[tokio::test]
    async fn test_invoke_rejects_before_submitting() {
        let server = MockServer::start().await;
        mount_entrypoints(&server).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "opHash": OP_HASH })))
            .expect(0)
            .mount(&server)
            .await;

        let contract = client(&server).resolve_contract(CONTRACT).await.unwrap();

        let unknown = contract.invoke("buryCarbon", &[]).await;
        assert!(matches!(unknown, Err(ChainError::Invocation { .. })));

        let malformed = contract.invoke("mint", &[json!("metadata_map")]).await;
        assert!(matches!(malformed, Err(ChainError::Invocation { .. })));

        let bad_owner = vec![json!({ "owner": "ownerA", "token_id": 0, "amount": 100 })];
        match contract.invoke("mint", &bad_owner).await {
            Err(err @ ChainError::Invocation { .. }) => {
                assert_eq!(
                    err.to_string(),
                    "Invocation of mint rejected: Invalid address for owner: ownerA"
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invoke_untyped_entrypoint_is_forwarded() {
        let server = MockServer::start().await;
        mount_entrypoints(&server).await;
        Mock::given(method("POST"))
            .and(path("/operations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "opHash": OP_HASH })))
            .expect(1)
            .mount(&server)
            .await;

        let contract = client(&server).resolve_contract(CONTRACT).await.unwrap();
        let pending = contract.invoke("setAdmin", &[json!(OWNER)]).await.unwrap();
        assert_eq!(pending.entrypoint, "setAdmin");
    }

    #[tokio::test]
    async fn test_invoke_gateway_rejection() {
        let server = MockServer::start().await;
        mount_entrypoints(&server).await;
        Mock::given(method("POST"))
            .and(path("/operations"))
            .respond_with(ResponseTemplate::new(400).set_body_string("counter_in_the_past"))
            .mount(&server)
            .await;

        let contract = client(&server).resolve_contract(CONTRACT).await.unwrap();
        let args = vec![json!({ "owner": OWNER, "token_id": 0, "amount": 100 })];
        match contract.invoke("mint", &args).await {
            Err(ChainError::Invocation { entrypoint, reason }) => {
                assert_eq!(entrypoint, "mint");
                assert_eq!(reason, "HTTP 400: counter_in_the_past");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_await_confirmation_polls_until_applied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/operations/{}", OP_HASH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "pending" })))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/operations/{}", OP_HASH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("applied", 1)))
            .mount(&server)
            .await;

        let pending = PendingOperation::new(OP_HASH, "mint");
        let confirmation = client(&server).await_confirmation(&pending).await.unwrap();

        match confirmation {
            Confirmation::Applied { block } => {
                assert_eq!(block.level, 123456);
                assert_eq!(block.chain_id, "NetXxkAx4woPLyu");
            }
            other => panic!("unexpected confirmation: {other:?}"),
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_await_confirmation_waits_for_required_depth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("applied", 1)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("applied", 2)))
            .mount(&server)
            .await;

        let mut settings = client(&server).settings().clone();
        settings.required_confirmations = 2;
        let client = GatewayClient::new(settings).unwrap();

        let pending = PendingOperation::new(OP_HASH, "mint");
        let confirmation = client.await_confirmation(&pending).await.unwrap();
        assert!(matches!(confirmation, Confirmation::Applied { .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_await_confirmation_with_unbounded_wait() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("applied", 1)))
            .mount(&server)
            .await;

        let mut settings = client(&server).settings().clone();
        settings.max_wait = Duration::from_secs(u64::MAX);
        let client = GatewayClient::new(settings).unwrap();

        let pending = PendingOperation::new(OP_HASH, "mint");
        let confirmation = client.await_confirmation(&pending).await.unwrap();
        assert!(matches!(confirmation, Confirmation::Applied { .. }));
    }

    #[tokio::test]
    async fn test_await_confirmation_reports_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "backtracked",
                "errors": [{ "id": "michelson_v1.script_rejected", "message": "FA2_NOT_OPERATOR" }]
            })))
            .mount(&server)
            .await;

        let pending = PendingOperation::new(OP_HASH, "buryCarbon");
        match client(&server).await_confirmation(&pending).await.unwrap() {
            Confirmation::Failed { reason, block } => {
                assert_eq!(reason, "michelson_v1.script_rejected: FA2_NOT_OPERATOR");
                assert!(block.is_none());
            }
            other => panic!("unexpected confirmation: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_await_confirmation_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut settings = client(&server).settings().clone();
        settings.max_wait = Duration::from_millis(50);
        let client = GatewayClient::new(settings).unwrap();

        let pending = PendingOperation::new(OP_HASH, "mint");
        match client.await_confirmation(&pending).await {
            Err(ChainError::Confirmation { op_hash, reason }) => {
                assert_eq!(op_hash, OP_HASH);
                assert!(reason.contains("not confirmed"));
                assert!(reason.contains("HTTP 404"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_permissions_checks_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wallet"))
            .and(query_param("name", "CarbonMarketplace"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "address": OWNER,
                "network": "granadanet"
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let wallet = client
            .request_permissions("CarbonMarketplace", "granadanet")
            .await
            .unwrap();
        assert_eq!(wallet.address, OWNER);

        let mismatch = client
            .request_permissions("CarbonMarketplace", "mainnet")
            .await;
        assert!(matches!(mismatch, Err(ChainError::Gateway(_))));
    }
}
