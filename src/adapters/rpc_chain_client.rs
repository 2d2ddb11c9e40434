//! JSON-RPC implementation of ChainClient.

use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::domain::TxHash;
use crate::ports::{ChainClient, ChainError, ReceiptState};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Subset of `eth_getTransactionReceipt` we care about
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: Option<String>,
    pub status: Option<String>,
}

fn parse_quantity(raw: &str) -> Result<u64, ChainError> {
    let digits = raw.trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .map_err(|_| ChainError::InvalidResponse(format!("bad quantity '{}'", raw)))
}

/// HTTP client for an EVM JSON-RPC node
#[derive(Clone)]
pub struct RpcChainClient {
    client: Client,
    rpc_url: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl RpcChainClient {
    /// Creates a new RpcChainClient with the specified node URL
    pub fn new(rpc_url: String) -> Self {
        Self::with_circuit_breaker(rpc_url, 3, 60)
    }

    /// Creates a new RpcChainClient with custom circuit breaker configuration
    pub fn with_circuit_breaker(
        rpc_url: String,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        RpcChainClient {
            client,
            rpc_url,
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    async fn call<T: DeserializeOwned + Send + 'static>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, ChainError> {
        let client = self.client.clone();
        let url = self.rpc_url.clone();
        let body = serde_json::to_value(RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        })
        .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?;
                let parsed = response.json::<RpcResponse<T>>().await?;
                if let Some(err) = parsed.error {
                    return Err(ChainError::Rpc {
                        code: err.code,
                        message: err.message,
                    });
                }
                Ok(parsed.result)
            })
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(ChainError::CircuitBreakerOpen(
                "RPC circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    pub async fn block_number(&self) -> Result<u64, ChainError> {
        let raw: Option<String> = self.call("eth_blockNumber", json!([])).await?;
        let raw = raw.ok_or_else(|| ChainError::InvalidResponse("missing block number".into()))?;
        parse_quantity(&raw)
    }

    pub async fn transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        self.call("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn receipt_state(&self, hash: &TxHash) -> Result<ReceiptState, ChainError> {
        let Some(receipt) = self.transaction_receipt(hash).await? else {
            return Ok(ReceiptState::NotFound);
        };

        if receipt.status.as_deref() == Some("0x0") {
            return Ok(ReceiptState::Reverted);
        }

        let Some(mined_in) = receipt.block_number.as_deref() else {
            return Ok(ReceiptState::NotFound);
        };
        let mined_in = parse_quantity(mined_in)?;
        let head = self.block_number().await?;

        Ok(ReceiptState::Included {
            confirmations: head.saturating_sub(mined_in) + 1,
        })
    }
}
