//! Submission backends: how an accepted tip leaves the process.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::TokenConfig;
use crate::domain::{Address, TipAmountUnit, TipRequest, TipStatus, TxHash};
use crate::error::TipError;
use crate::ports::{PaymentSigner, RecipientResolver, ResolveError, SignerError, TokenTransfer};
use crate::x402::{PaymentBudget, PaymentClient, PaymentClientError, PaymentEvent};

/// Called by a backend when the attempt moves to `signing` or `pending`.
pub type ProgressFn = dyn Fn(TipStatus) + Send + Sync;

/// Everything a backend needs for one dispatch.
#[derive(Clone)]
pub struct TipDispatch {
    pub request: TipRequest,
    pub units: TipAmountUnit,
    pub from: Address,
    pub signer: Arc<dyn PaymentSigner>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub tx_hash: Option<TxHash>,
    /// The counterparty already vouched for settlement; no chain tracking needed.
    pub settled: bool,
}

#[async_trait]
pub trait TipBackend: Send + Sync {
    async fn dispatch(
        &self,
        dispatch: &TipDispatch,
        progress: &ProgressFn,
    ) -> Result<DispatchReceipt, TipError>;
}

pub fn map_signer_error(err: SignerError) -> TipError {
    match err {
        SignerError::Rejected => TipError::UserRejected,
        SignerError::InsufficientFunds(detail) => TipError::PaymentRequired(detail),
        SignerError::Other(detail) if detail.to_lowercase().contains("insufficient funds") => {
            TipError::PaymentRequired(detail)
        }
        SignerError::Other(detail) => TipError::NetworkOrUnknown(detail),
    }
}

/// Body of `POST /tip`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TipBody<'a> {
    pub username: &'a str,
    /// Smallest-unit amount as a decimal string.
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    pub from: String,
}

/// Server-mediated submission through the x402 payment client.
///
/// A payment challenge is only signed when it asks for at most the tip's own
/// amount in the configured token.
pub struct HttpTipBackend {
    client: reqwest::Client,
    base_url: String,
    path: String,
    network: String,
    asset: Address,
}

impl HttpTipBackend {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        path: String,
        network: String,
        asset: Address,
    ) -> Self {
        Self {
            client,
            base_url,
            path,
            network,
            asset,
        }
    }

    fn payment_client(&self, signer: Arc<dyn PaymentSigner>, units: &TipAmountUnit) -> PaymentClient {
        PaymentClient::new(
            self.client.clone(),
            self.base_url.clone(),
            signer,
            self.network.clone(),
            PaymentBudget {
                max_amount: units.value,
                asset: self.asset,
            },
        )
    }
}

fn map_client_error(err: PaymentClientError) -> TipError {
    match err {
        PaymentClientError::PaymentRequired(reason) => TipError::PaymentRequired(reason),
        PaymentClientError::NoAcceptableRequirement(network) => {
            TipError::PaymentRequired(format!("no payment option for network {}", network))
        }
        PaymentClientError::OverBudget { max_amount } => TipError::PaymentRequired(format!(
            "payment challenge exceeds the {} unit tip",
            max_amount
        )),
        PaymentClientError::Signer(e) => map_signer_error(e),
        PaymentClientError::Status { status: 400, message } => TipError::BadRequest(message),
        PaymentClientError::Status { status: 402, message } => TipError::PaymentRequired(message),
        PaymentClientError::Status { status, message } => {
            TipError::NetworkOrUnknown(format!("server returned {}: {}", status, message))
        }
        PaymentClientError::Request(e) => TipError::NetworkOrUnknown(e.to_string()),
        PaymentClientError::Encoding(e) => TipError::NetworkOrUnknown(e.to_string()),
    }
}

fn parse_hash(raw: Option<&str>) -> Option<TxHash> {
    let raw = raw?.trim();
    match raw.parse() {
        Ok(hash) => Some(hash),
        Err(e) => {
            warn!(raw = %raw, "Ignoring malformed transaction hash: {}", e);
            None
        }
    }
}

#[async_trait]
impl TipBackend for HttpTipBackend {
    async fn dispatch(
        &self,
        dispatch: &TipDispatch,
        progress: &ProgressFn,
    ) -> Result<DispatchReceipt, TipError> {
        let client = self.payment_client(dispatch.signer.clone(), &dispatch.units);
        let body = TipBody {
            username: dispatch.request.recipient(),
            amount: dispatch.units.value.to_string(),
            message: dispatch.request.message(),
            from: dispatch.from.to_string(),
        };

        progress(TipStatus::Signing);
        let observer = |event: PaymentEvent| {
            if event == PaymentEvent::PaymentSigned {
                progress(TipStatus::Pending);
            }
        };

        let response = client
            .post_json_observed(&self.path, &body, &observer)
            .await
            .map_err(map_client_error)?;

        let body_hash = response.body.get("txHash").and_then(Value::as_str);
        let settlement_hash = response
            .settlement
            .as_ref()
            .filter(|s| s.success && !s.transaction.is_empty())
            .map(|s| s.transaction.as_str());
        let tx_hash = parse_hash(
            body_hash
                .or(response.tx_hash_header.as_deref())
                .or(settlement_hash),
        );

        info!(
            recipient = %dispatch.request.recipient(),
            paid = response.paid,
            tx_hash = ?tx_hash,
            "Tip accepted by server"
        );

        Ok(DispatchReceipt {
            tx_hash,
            settled: true,
        })
    }
}

/// On-chain submission: the wallet signs an ERC-20 transfer to the streamer.
pub struct DirectTransferBackend {
    resolver: Arc<dyn RecipientResolver>,
    token: TokenConfig,
}

impl DirectTransferBackend {
    pub fn new(resolver: Arc<dyn RecipientResolver>, token: TokenConfig) -> Self {
        Self { resolver, token }
    }
}

#[async_trait]
impl TipBackend for DirectTransferBackend {
    async fn dispatch(
        &self,
        dispatch: &TipDispatch,
        progress: &ProgressFn,
    ) -> Result<DispatchReceipt, TipError> {
        let to = self
            .resolver
            .resolve(dispatch.request.recipient())
            .await
            .map_err(|e| match e {
                ResolveError::UnknownRecipient(name) => {
                    TipError::BadRequest(format!("unknown streamer @{}", name))
                }
                ResolveError::Unavailable(detail) => TipError::NetworkOrUnknown(detail),
            })?;

        if to == dispatch.from {
            return Err(TipError::BadRequest("cannot tip your own wallet".to_string()));
        }

        progress(TipStatus::Signing);
        let transfer = TokenTransfer {
            token: self.token.address,
            to,
            amount: dispatch.units,
        };
        let hash = dispatch
            .signer
            .transfer(&transfer)
            .await
            .map_err(map_signer_error)?;

        info!(
            recipient = %dispatch.request.recipient(),
            to = %to,
            tx_hash = %hash,
            "Transfer broadcast"
        );

        Ok(DispatchReceipt {
            tx_hash: Some(hash),
            settled: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_error_mapping() {
        assert_eq!(map_signer_error(SignerError::Rejected), TipError::UserRejected);
        assert!(matches!(
            map_signer_error(SignerError::InsufficientFunds("0 USDC".into())),
            TipError::PaymentRequired(_)
        ));
        assert!(matches!(
            map_signer_error(SignerError::Other("execution reverted: insufficient funds".into())),
            TipError::PaymentRequired(_)
        ));
        assert!(matches!(
            map_signer_error(SignerError::Other("timeout".into())),
            TipError::NetworkOrUnknown(_)
        ));
    }

    #[test]
    fn test_client_error_mapping() {
        assert!(matches!(
            map_client_error(PaymentClientError::Status {
                status: 400,
                message: "username required".into()
            }),
            TipError::BadRequest(_)
        ));
        assert!(matches!(
            map_client_error(PaymentClientError::Status {
                status: 503,
                message: "down".into()
            }),
            TipError::NetworkOrUnknown(_)
        ));
        assert!(matches!(
            map_client_error(PaymentClientError::PaymentRequired("insufficient_funds".into())),
            TipError::PaymentRequired(_)
        ));
    }

    #[test]
    fn test_tip_body_omits_empty_message() {
        let body = TipBody {
            username: "ninja",
            amount: "1000000".to_string(),
            message: None,
            from: "0x0000000000000000000000000000000000000001".to_string(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["amount"], "1000000");
        assert!(value.get("message").is_none());
    }

    #[test]
    fn test_parse_hash_ignores_garbage() {
        assert!(parse_hash(Some("pending")).is_none());
        assert!(parse_hash(None).is_none());
        let raw = format!("0x{}", "cd".repeat(32));
        assert!(parse_hash(Some(&raw)).is_some());
    }
}
