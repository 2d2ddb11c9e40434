use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::Address;
use crate::ports::{PaymentSigner, SignerError};
use crate::utils::sanitize::sanitize_json;
use crate::x402::types::{
    decode_header, encode_header, PaymentRequiredResponse, PaymentRequirements,
    SettlementResponse, PAYMENT_HEADER, PAYMENT_RESPONSE_HEADER, SCHEME_EXACT,
};

pub const TX_HASH_HEADER: &str = "x-transaction-hash";

#[derive(Error, Debug)]
pub enum PaymentClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Payment required: {0}")]
    PaymentRequired(String),
    #[error("No acceptable payment requirement for network {0}")]
    NoAcceptableRequirement(String),
    #[error("Payment challenge exceeds the {max_amount}-unit budget or names another asset")]
    OverBudget { max_amount: u128 },
    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),
    #[error("Could not encode payment header: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// Progress notifications emitted while a request is being paid for.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    ChallengeReceived(PaymentRequirements),
    PaymentSigned,
}

#[derive(Debug, Clone)]
pub struct PaidResponse {
    pub status: u16,
    pub body: Value,
    pub settlement: Option<SettlementResponse>,
    pub tx_hash_header: Option<String>,
    /// A payment challenge was answered on the way.
    pub paid: bool,
}

/// Most the client will authorize for one request, in smallest units of `asset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentBudget {
    pub max_amount: u128,
    pub asset: Address,
}

impl PaymentBudget {
    /// Unparseable amounts or assets never fit.
    pub fn allows(&self, requirements: &PaymentRequirements) -> bool {
        let within_amount = requirements
            .max_amount()
            .is_some_and(|amount| amount <= self.max_amount);
        let same_asset = requirements
            .asset
            .parse::<Address>()
            .is_ok_and(|asset| asset == self.asset);
        within_amount && same_asset
    }
}

/// HTTP client that answers `402 Payment Required` by signing the server's
/// challenge with the wallet signer and replaying the request once.
#[derive(Clone)]
pub struct PaymentClient {
    client: Client,
    base_url: String,
    signer: Arc<dyn PaymentSigner>,
    network: String,
    budget: PaymentBudget,
}

impl PaymentClient {
    pub fn new(
        client: Client,
        base_url: String,
        signer: Arc<dyn PaymentSigner>,
        network: String,
        budget: PaymentBudget,
    ) -> Self {
        PaymentClient {
            client,
            base_url,
            signer,
            network,
            budget,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<PaidResponse, PaymentClientError> {
        self.post_json_observed(path, body, &|_| {}).await
    }

    pub async fn post_json_observed<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        observer: &(dyn Fn(PaymentEvent) + Send + Sync),
    ) -> Result<PaidResponse, PaymentClientError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        if let Ok(value) = serde_json::to_value(body) {
            tracing::debug!(url = %url, body = %sanitize_json(&value), "POST");
        }

        let response = self.client.post(&url).json(body).send().await?;
        if response.status() != StatusCode::PAYMENT_REQUIRED {
            return finish(response, false).await;
        }

        let challenge = match response.json::<PaymentRequiredResponse>().await {
            Ok(challenge) => challenge,
            Err(e) => {
                return Err(PaymentClientError::PaymentRequired(format!(
                    "unreadable payment challenge: {}",
                    e
                )))
            }
        };
        let requirements = self.select_requirements(&challenge)?;
        tracing::info!(
            network = %requirements.network,
            amount = %requirements.max_amount_required,
            pay_to = %requirements.pay_to,
            "Payment challenge received"
        );
        observer(PaymentEvent::ChallengeReceived(requirements.clone()));

        let payload = self.signer.sign_payment(&requirements).await?;
        let header = encode_header(&payload)?;
        observer(PaymentEvent::PaymentSigned);

        let response = self
            .client
            .post(&url)
            .header(PAYMENT_HEADER, header)
            .json(body)
            .send()
            .await?;

        if response.status() == StatusCode::PAYMENT_REQUIRED {
            let reason = response
                .json::<PaymentRequiredResponse>()
                .await
                .ok()
                .and_then(|c| c.error)
                .unwrap_or_else(|| "payment was not accepted".to_string());
            tracing::warn!(reason = %reason, "Payment rejected by server");
            return Err(PaymentClientError::PaymentRequired(reason));
        }

        finish(response, true).await
    }

    fn select_requirements(
        &self,
        challenge: &PaymentRequiredResponse,
    ) -> Result<PaymentRequirements, PaymentClientError> {
        let mut offered = challenge
            .accepts
            .iter()
            .filter(|r| r.scheme == SCHEME_EXACT && r.network.eq_ignore_ascii_case(&self.network))
            .peekable();
        if offered.peek().is_none() {
            return Err(PaymentClientError::NoAcceptableRequirement(self.network.clone()));
        }

        offered
            .find(|r| {
                let allowed = self.budget.allows(r);
                if !allowed {
                    tracing::warn!(
                        asked = %r.max_amount_required,
                        asset = %r.asset,
                        max_amount = %self.budget.max_amount,
                        "Payment challenge outside budget"
                    );
                }
                allowed
            })
            .cloned()
            .ok_or(PaymentClientError::OverBudget {
                max_amount: self.budget.max_amount,
            })
    }
}

async fn finish(response: Response, paid: bool) -> Result<PaidResponse, PaymentClientError> {
    let status = response.status();
    let headers = response.headers().clone();
    let text = response.text().await?;
    let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::Null);

    if !status.is_success() {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(text);
        return Err(PaymentClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let settlement = headers
        .get(PAYMENT_RESPONSE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(decode_header::<SettlementResponse>);
    let tx_hash_header = headers
        .get(TX_HASH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Ok(PaidResponse {
        status: status.as_u16(),
        body,
        settlement,
        tx_hash_header,
        paid,
    })
}
