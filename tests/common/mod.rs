#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::json;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use streamertip_core::config::token::{DEFAULT_TOKEN_ADDRESS, DEFAULT_TOKEN_SYMBOL};
use streamertip_core::config::TokenConfig;
use streamertip_core::domain::{Address, TipLimits, TxHash};
use streamertip_core::ports::{
    ChainClient, ChainError, PaymentSigner, ReceiptState, SignerError, TokenTransfer,
    WalletSession,
};
use streamertip_core::x402::{PaymentPayload, PaymentRequirements, X402_VERSION};
use streamertip_core::FlowSettings;

pub const TIPPER: Address = Address::new([0xaa; 20]);
pub const STREAMER: Address = Address::new([0xbb; 20]);
pub const HASH: TxHash = TxHash::new([0x42; 32]);

#[derive(Debug, Clone)]
pub enum Outcome {
    Approve,
    Reject,
    Broke,
}

pub struct FakeSigner {
    outcome: Mutex<Outcome>,
    delay: Duration,
    pub transfers: AtomicUsize,
    pub signatures: AtomicUsize,
}

impl FakeSigner {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            delay: Duration::ZERO,
            transfers: AtomicUsize::new(0),
            signatures: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_outcome(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    fn outcome(&self) -> Outcome {
        self.outcome.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

pub fn payload_for(requirements: &PaymentRequirements) -> PaymentPayload {
    PaymentPayload {
        x402_version: X402_VERSION,
        scheme: requirements.scheme.clone(),
        network: requirements.network.clone(),
        payload: json!({
            "signature": "0xdeadbeef",
            "authorization": {
                "from": TIPPER.to_string(),
                "to": requirements.pay_to,
                "value": requirements.max_amount_required,
            }
        }),
    }
}

#[async_trait]
impl PaymentSigner for FakeSigner {
    fn address(&self) -> Address {
        TIPPER
    }

    async fn sign_payment(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentPayload, SignerError> {
        self.signatures.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        match self.outcome() {
            Outcome::Approve | Outcome::Broke => Ok(payload_for(requirements)),
            Outcome::Reject => Err(SignerError::Rejected),
        }
    }

    async fn transfer(&self, _transfer: &TokenTransfer) -> Result<TxHash, SignerError> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        match self.outcome() {
            Outcome::Approve => Ok(HASH),
            Outcome::Reject => Err(SignerError::Rejected),
            Outcome::Broke => Err(SignerError::InsufficientFunds("0 USDC".to_string())),
        }
    }
}

pub struct FakeWallet {
    connected: AtomicBool,
    signer: Arc<FakeSigner>,
}

impl FakeWallet {
    pub fn connected(signer: Arc<FakeSigner>) -> Self {
        Self {
            connected: AtomicBool::new(true),
            signer,
        }
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl WalletSession for FakeWallet {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn account(&self) -> Option<Address> {
        self.is_connected().then_some(TIPPER)
    }

    fn signer(&self) -> Option<Arc<dyn PaymentSigner>> {
        if !self.is_connected() {
            return None;
        }
        let signer: Arc<dyn PaymentSigner> = self.signer.clone();
        Some(signer)
    }
}

/// Replays receipt states in order, repeating the last one.
pub struct ScriptedChain {
    states: Mutex<VecDeque<Result<ReceiptState, String>>>,
    pub polls: AtomicUsize,
}

impl ScriptedChain {
    pub fn new(states: Vec<Result<ReceiptState, String>>) -> Self {
        Self {
            states: Mutex::new(states.into()),
            polls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn receipt_state(&self, _hash: &TxHash) -> Result<ReceiptState, ChainError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut states = self.states.lock().unwrap();
        let next = if states.len() > 1 {
            states.pop_front()
        } else {
            states.front().cloned()
        };
        match next.unwrap_or(Ok(ReceiptState::NotFound)) {
            Ok(state) => Ok(state),
            Err(message) => Err(ChainError::Rpc { code: -32000, message }),
        }
    }
}

pub fn settings() -> FlowSettings {
    FlowSettings {
        token: TokenConfig {
            address: DEFAULT_TOKEN_ADDRESS.parse().unwrap(),
            decimals: 6,
            symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
        },
        limits: TipLimits::default(),
        presets: ["0.1", "1", "5", "10"]
            .iter()
            .map(|p| BigDecimal::from_str(p).unwrap())
            .collect(),
        success_reset: Duration::from_secs(5),
        error_reset: Duration::from_secs(8),
        settle_delay: Duration::ZERO,
    }
}

pub fn dec(raw: &str) -> BigDecimal {
    BigDecimal::from_str(raw).unwrap()
}
