//! Send-tip use case: the state machine that takes the form contents to a
//! confirmed (or failed) payment and back to idle.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{Config, TokenConfig};
use crate::domain::{
    TipLimits, TipRequest, TipStatus, TipSummary, TransactionRecord, TxHash,
};
use crate::error::TipError;
use crate::form::{AmountSelector, PresetAmount, TipForm};
use crate::ports::WalletSession;
use crate::services::submitter::{DispatchReceipt, TipBackend, TipDispatch};
use crate::services::tracker::{TrackError, TransactionTracker};

const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Timing and limits of the flow.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub token: TokenConfig,
    pub limits: TipLimits,
    pub presets: Vec<BigDecimal>,
    pub success_reset: Duration,
    pub error_reset: Duration,
    /// How long a settled tip without a hash sits in `confirming`.
    pub settle_delay: Duration,
}

impl FlowSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            token: config.token.clone(),
            limits: TipLimits {
                min_amount: config.min_tip_amount.clone(),
            },
            presets: config.tip_presets.clone(),
            success_reset: config.success_reset,
            error_reset: config.error_reset,
            settle_delay: config.settle_delay,
        }
    }

    fn amount_selector(&self) -> AmountSelector {
        let presets: Vec<PresetAmount> = self.presets.iter().cloned().map(PresetAmount::new).collect();
        let one = BigDecimal::from(1);
        let default = if self.presets.contains(&one) {
            one
        } else {
            self.presets.first().cloned().unwrap_or(one)
        };
        AmountSelector::new(presets, default)
    }
}

/// One transition, as published to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub attempt_id: Option<Uuid>,
    pub status: TipStatus,
    pub tx_hash: Option<TxHash>,
    pub error: Option<TipError>,
    pub timestamp: DateTime<Utc>,
}

impl From<&TransactionRecord> for StatusUpdate {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            attempt_id: record.attempt_id,
            status: record.status,
            tx_hash: record.tx_hash,
            error: record.error.clone(),
            timestamp: record.updated_at,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("a tip is already being submitted")]
    AttemptInFlight,
}

struct FlowState {
    form: TipForm,
    record: TransactionRecord,
    reset_task: Option<JoinHandle<()>>,
}

struct Shared {
    state: Mutex<FlowState>,
    updates: broadcast::Sender<StatusUpdate>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, record: &TransactionRecord) {
        // No subscribers is fine.
        let _ = self.updates.send(StatusUpdate::from(record));
    }

    /// Applies `next` only while `attempt` is still the current one.
    fn transition(&self, attempt: Uuid, next: TipStatus) {
        let mut state = self.lock();
        if state.record.attempt_id != Some(attempt) || state.record.status == next {
            return;
        }
        match state.record.advance(next) {
            Ok(()) => {
                debug!(attempt_id = %attempt, status = %next, "Tip status changed");
                self.publish(&state.record);
            }
            Err(e) => warn!(attempt_id = %attempt, "Ignoring transition: {}", e),
        }
    }
}

/// Fails the attempt if its `submit()` future is dropped before finishing,
/// so the flow does not stay in flight forever.
struct AbandonGuard {
    shared: Arc<Shared>,
    attempt: Uuid,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if state.record.attempt_id != Some(self.attempt) || !state.record.status.is_in_flight() {
            return;
        }
        let abandoned = TipError::NetworkOrUnknown("tip attempt was abandoned".to_string());
        if state.record.fail(abandoned).is_ok() {
            warn!(attempt_id = %self.attempt, "Tip attempt abandoned before finishing");
            self.shared.publish(&state.record);
        }
    }
}

/// Tip-submission flow for one recipient page.
///
/// At most one attempt is in flight at a time. Terminal states fall back to
/// idle after a delay; the delayed reset is a cancellable task that only ever
/// touches the attempt that scheduled it.
pub struct TipFlow {
    recipient: String,
    wallet: Arc<dyn WalletSession>,
    backend: Arc<dyn TipBackend>,
    tracker: Option<TransactionTracker>,
    settings: FlowSettings,
    shared: Arc<Shared>,
}

impl TipFlow {
    pub fn new(
        recipient: impl Into<String>,
        wallet: Arc<dyn WalletSession>,
        backend: Arc<dyn TipBackend>,
        tracker: Option<TransactionTracker>,
        settings: FlowSettings,
    ) -> Self {
        let (updates, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let form = TipForm::new(settings.amount_selector());
        Self {
            recipient: recipient.into(),
            wallet,
            backend,
            tracker,
            settings,
            shared: Arc::new(Shared {
                state: Mutex::new(FlowState {
                    form,
                    record: TransactionRecord::idle(),
                    reset_task: None,
                }),
                updates,
            }),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.shared.updates.subscribe()
    }

    pub fn snapshot(&self) -> TransactionRecord {
        self.shared.lock().record.clone()
    }

    pub fn form(&self) -> TipForm {
        self.shared.lock().form.clone()
    }

    pub fn amount(&self) -> BigDecimal {
        self.shared.lock().form.amount.value().clone()
    }

    pub fn select_preset(&self, amount: &BigDecimal) -> bool {
        self.shared.lock().form.amount.select_preset(amount)
    }

    pub fn set_custom_amount(&self, text: &str) {
        self.shared.lock().form.amount.set_custom(text);
    }

    pub fn set_message(&self, text: &str) {
        self.shared.lock().form.message.set_text(text);
    }

    pub fn is_wallet_connected(&self) -> bool {
        self.wallet.is_connected()
    }

    pub fn can_submit(&self) -> bool {
        let state = self.shared.lock();
        state.form.amount.is_valid()
            && self.wallet.is_connected()
            && !state.record.status.is_in_flight()
    }

    /// Returns to idle now, cancelling any scheduled reset.
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        if state.record.status.is_in_flight() {
            return;
        }
        if let Some(task) = state.reset_task.take() {
            task.abort();
        }
        if state.record.status == TipStatus::Success {
            state.form.clear();
        }
        if state.record.status != TipStatus::Idle {
            state.record = TransactionRecord::idle();
            self.shared.publish(&state.record);
        }
    }

    /// Runs one attempt to its terminal state and returns the final record.
    /// Failures end in the `error` state; only a second submission while one
    /// is in flight is refused outright. Dropping the future mid-attempt
    /// leaves the attempt in `error` with no scheduled reset.
    pub async fn submit(&self) -> Result<TransactionRecord, FlowError> {
        let (attempt, amount, message) = {
            let mut state = self.shared.lock();
            if state.record.status.is_in_flight() {
                warn!(recipient = %self.recipient, "Tip already in flight; ignoring submit");
                return Err(FlowError::AttemptInFlight);
            }
            if let Some(task) = state.reset_task.take() {
                task.abort();
            }

            let attempt = Uuid::new_v4();
            state.record = TransactionRecord::begin(attempt);
            self.shared.publish(&state.record);
            (
                attempt,
                state.form.amount.value().clone(),
                state.form.message.text().to_string(),
            )
        };

        info!(attempt_id = %attempt, recipient = %self.recipient, amount = %amount, "Submitting tip");

        let _guard = AbandonGuard {
            shared: self.shared.clone(),
            attempt,
        };
        let outcome = self.run_attempt(attempt, amount, &message).await;
        Ok(self.finish(attempt, outcome))
    }

    async fn run_attempt(
        &self,
        attempt: Uuid,
        amount: BigDecimal,
        message: &str,
    ) -> Result<(), TipError> {
        if !self.wallet.is_connected() {
            return Err(TipError::WalletNotConnected);
        }
        let (from, signer) = match (self.wallet.account(), self.wallet.signer()) {
            (Some(from), Some(signer)) => (from, signer),
            _ => return Err(TipError::WalletNotConnected),
        };

        let request = TipRequest::new(&self.recipient, amount, message, &self.settings.limits)?;
        let units = self.settings.token.to_units(request.amount())?;
        {
            let mut state = self.shared.lock();
            if state.record.attempt_id == Some(attempt) {
                state.record.tip = Some(TipSummary {
                    recipient: request.recipient().to_string(),
                    amount: request.amount().clone(),
                });
            }
        }

        let dispatch = TipDispatch {
            request,
            units,
            from,
            signer,
        };
        let shared = self.shared.clone();
        let progress = move |status: TipStatus| shared.transition(attempt, status);
        let receipt = self.backend.dispatch(&dispatch, &progress).await?;

        self.confirm(attempt, receipt).await
    }

    async fn confirm(&self, attempt: Uuid, receipt: DispatchReceipt) -> Result<(), TipError> {
        if let Some(hash) = receipt.tx_hash {
            let mut state = self.shared.lock();
            if state.record.attempt_id == Some(attempt) {
                if let Err(e) = state.record.set_hash(hash) {
                    warn!(attempt_id = %attempt, "{}", e);
                }
            }
        }

        match (receipt.tx_hash, &self.tracker) {
            (Some(hash), Some(tracker)) if !receipt.settled => {
                let shared = self.shared.clone();
                tracker
                    .track(hash, move |status| {
                        if status.is_confirming || status.is_confirmed {
                            shared.transition(attempt, TipStatus::Confirming);
                        }
                    })
                    .await
                    .map_err(|e| match e {
                        TrackError::Reverted(_) => {
                            TipError::NetworkOrUnknown("transaction reverted".to_string())
                        }
                        TrackError::TimedOut { .. } => TipError::NetworkOrUnknown(e.to_string()),
                    })?;
                self.shared.transition(attempt, TipStatus::Confirming);
            }
            _ => {
                self.shared.transition(attempt, TipStatus::Confirming);
                if receipt.settled && !self.settings.settle_delay.is_zero() {
                    tokio::time::sleep(self.settings.settle_delay).await;
                }
            }
        }

        Ok(())
    }

    fn finish(&self, attempt: Uuid, outcome: Result<(), TipError>) -> TransactionRecord {
        let mut state = self.shared.lock();
        if state.record.attempt_id != Some(attempt) {
            return state.record.clone();
        }

        let (delay, clear_form) = match outcome {
            Ok(()) => {
                if let Err(e) = state.record.advance(TipStatus::Success) {
                    warn!(attempt_id = %attempt, "{}", e);
                }
                info!(attempt_id = %attempt, tx_hash = ?state.record.tx_hash, "Tip sent");
                (self.settings.success_reset, true)
            }
            Err(err) => {
                error!(attempt_id = %attempt, kind = err.kind(), "Tip failed: {}", err);
                if let Err(e) = state.record.fail(err) {
                    warn!(attempt_id = %attempt, "{}", e);
                }
                (self.settings.error_reset, false)
            }
        };
        self.shared.publish(&state.record);

        let shared = self.shared.clone();
        state.reset_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = shared.lock();
            if state.record.attempt_id != Some(attempt) || !state.record.status.is_terminal() {
                return;
            }
            if clear_form {
                state.form.clear();
            }
            state.record = TransactionRecord::idle();
            state.reset_task = None;
            shared.publish(&state.record);
            debug!(attempt_id = %attempt, "Tip flow reset to idle");
        }));

        state.record.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::token::{DEFAULT_TOKEN_ADDRESS, DEFAULT_TOKEN_SYMBOL};

    fn settings() -> FlowSettings {
        FlowSettings {
            token: TokenConfig {
                address: DEFAULT_TOKEN_ADDRESS.parse().unwrap(),
                decimals: 6,
                symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            },
            limits: TipLimits::default(),
            presets: vec![BigDecimal::from(2), BigDecimal::from(20)],
            success_reset: Duration::from_secs(5),
            error_reset: Duration::from_secs(8),
            settle_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_default_amount_falls_back_to_first_preset() {
        let selector = settings().amount_selector();
        assert_eq!(selector.value(), &BigDecimal::from(2));
        assert_eq!(selector.presets().len(), 2);
    }

    #[test]
    fn test_status_update_from_record() {
        let attempt = Uuid::new_v4();
        let record = TransactionRecord::begin(attempt);
        let update = StatusUpdate::from(&record);
        assert_eq!(update.attempt_id, Some(attempt));
        assert_eq!(update.status, TipStatus::Preparing);
        assert!(update.tx_hash.is_none());
    }
}
