//! Seams to the collaborators the tip flow consumes but does not implement:
//! the wallet session, its signer, the chain, and the streamer directory.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{Address, TipAmountUnit, TxHash};
use crate::x402::{PaymentPayload, PaymentRequirements};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("signature request rejected by the wallet holder")]
    Rejected,
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("signer failure: {0}")]
    Other(String),
}

/// ERC-20 `transfer(to, value)` on `token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTransfer {
    pub token: Address,
    pub to: Address,
    pub amount: TipAmountUnit,
}

/// Authorization capability of the connected wallet account.
#[async_trait]
pub trait PaymentSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Authorizes a payment matching an x402 challenge.
    async fn sign_payment(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentPayload, SignerError>;

    /// Signs and broadcasts a token transfer, returning its hash.
    async fn transfer(&self, transfer: &TokenTransfer) -> Result<TxHash, SignerError>;
}

/// Externally owned wallet connection. The flow only reads from it.
pub trait WalletSession: Send + Sync {
    fn is_connected(&self) -> bool;
    fn account(&self) -> Option<Address>;
    fn signer(&self) -> Option<Arc<dyn PaymentSigner>>;
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("RPC request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Invalid response from node: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

/// What the chain currently knows about a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptState {
    /// Not mined yet (or not yet visible to the node).
    NotFound,
    Included { confirmations: u64 },
    Reverted,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn receipt_state(&self, hash: &TxHash) -> Result<ReceiptState, ChainError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown streamer: {0}")]
    UnknownRecipient(String),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Maps a streamer handle to the address that receives their tips.
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    async fn resolve(&self, username: &str) -> Result<Address, ResolveError>;
}
