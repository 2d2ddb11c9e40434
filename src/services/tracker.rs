use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::TxHash;
use crate::ports::{ChainClient, ReceiptState};

pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Derived view of a tracked transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfirmationStatus {
    pub is_confirming: bool,
    pub is_confirmed: bool,
}

impl ConfirmationStatus {
    pub fn from_receipt(
        state: ReceiptState,
        required_confirmations: u64,
    ) -> Option<ConfirmationStatus> {
        match state {
            ReceiptState::NotFound => Some(ConfirmationStatus {
                is_confirming: true,
                is_confirmed: false,
            }),
            ReceiptState::Included { confirmations } => {
                let done = confirmations >= required_confirmations;
                Some(ConfirmationStatus {
                    is_confirming: !done,
                    is_confirmed: done,
                })
            }
            ReceiptState::Reverted => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("transaction {hash} not confirmed after {after:?}")]
    TimedOut { hash: TxHash, after: Duration },
}

/// Follows one transaction hash until the chain reports it confirmed.
#[derive(Clone)]
pub struct TransactionTracker {
    chain: Arc<dyn ChainClient>,
    poll_interval: Duration,
    required_confirmations: u64,
    timeout: Option<Duration>,
}

impl TransactionTracker {
    /// A zero interval is raised to [`MIN_POLL_INTERVAL`].
    pub fn new(chain: Arc<dyn ChainClient>, poll_interval: Duration) -> Self {
        Self {
            chain,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            required_confirmations: 1,
            timeout: None,
        }
    }

    pub fn with_required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations.max(1);
        self
    }

    /// Without a timeout a stalled transaction is waited on forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Polls until confirmed, calling `on_update` whenever the pair changes.
    /// Transient chain errors are logged and polling continues.
    pub async fn track<F>(&self, hash: TxHash, mut on_update: F) -> Result<ConfirmationStatus, TrackError>
    where
        F: FnMut(ConfirmationStatus) + Send,
    {
        let poll = self.poll_until_confirmed(hash, &mut on_update);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, poll)
                .await
                .map_err(|_| TrackError::TimedOut { hash, after: limit })?,
            None => poll.await,
        }
    }

    /// Spawns [`track`](Self::track) and exposes only the latest pair.
    pub fn watch(&self, hash: TxHash) -> watch::Receiver<ConfirmationStatus> {
        let (tx, rx) = watch::channel(ConfirmationStatus::default());
        let tracker = self.clone();
        tokio::spawn(async move {
            let result = tracker
                .track(hash, |status| {
                    let _ = tx.send(status);
                })
                .await;
            if let Err(e) = result {
                warn!(tx_hash = %hash, "Stopped watching transaction: {}", e);
            }
        });
        rx
    }

    async fn poll_until_confirmed<F>(
        &self,
        hash: TxHash,
        on_update: &mut F,
    ) -> Result<ConfirmationStatus, TrackError>
    where
        F: FnMut(ConfirmationStatus) + Send,
    {
        let mut last = ConfirmationStatus::default();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let state = match self.chain.receipt_state(&hash).await {
                Ok(state) => state,
                Err(e) => {
                    warn!(tx_hash = %hash, "Receipt lookup failed: {}", e);
                    continue;
                }
            };
            debug!(tx_hash = %hash, ?state, "Polled receipt");

            let status = ConfirmationStatus::from_receipt(state, self.required_confirmations)
                .ok_or(TrackError::Reverted(hash))?;

            if status != last {
                on_update(status);
                last = status;
            }

            if status.is_confirmed {
                info!(tx_hash = %hash, "Transaction confirmed");
                return Ok(status);
            }
        }
    }
}
