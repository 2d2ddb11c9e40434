//! Transaction record of one tip attempt and its status machine.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::TxHash;
use crate::error::TipError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TipStatus {
    Idle,
    Preparing,
    Signing,
    Pending,
    Confirming,
    Success,
    Error,
}

impl TipStatus {
    /// An attempt is running and a second submission must be refused.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            TipStatus::Preparing | TipStatus::Signing | TipStatus::Pending | TipStatus::Confirming
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TipStatus::Success | TipStatus::Error)
    }

    pub fn can_transition_to(self, next: TipStatus) -> bool {
        use TipStatus::*;

        match (self, next) {
            (Idle | Success | Error, Preparing) => true,
            (Success | Error, Idle) => true,
            (Preparing, Signing) => true,
            (Signing, Pending | Confirming) => true,
            (Pending, Confirming) => true,
            (Confirming, Success) => true,
            (from, Error) => from.is_in_flight(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TipStatus::Idle => "idle",
            TipStatus::Preparing => "preparing",
            TipStatus::Signing => "signing",
            TipStatus::Pending => "pending",
            TipStatus::Confirming => "confirming",
            TipStatus::Success => "success",
            TipStatus::Error => "error",
        }
    }
}

impl fmt::Display for TipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition { from: TipStatus, to: TipStatus },
    #[error("transaction hash already set to {0}")]
    HashAlreadySet(TxHash),
}

/// What was sent and to whom, kept for the success text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TipSummary {
    pub recipient: String,
    pub amount: BigDecimal,
}

/// Outcome of one tip attempt. A new attempt gets a new record.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub attempt_id: Option<Uuid>,
    pub status: TipStatus,
    pub tx_hash: Option<TxHash>,
    pub error: Option<TipError>,
    pub tip: Option<TipSummary>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn idle() -> Self {
        Self {
            attempt_id: None,
            status: TipStatus::Idle,
            tx_hash: None,
            error: None,
            tip: None,
            updated_at: Utc::now(),
        }
    }

    /// Fresh record for a new attempt, already in `preparing`.
    pub fn begin(attempt_id: Uuid) -> Self {
        Self {
            attempt_id: Some(attempt_id),
            status: TipStatus::Preparing,
            tx_hash: None,
            error: None,
            tip: None,
            updated_at: Utc::now(),
        }
    }

    pub fn advance(&mut self, next: TipStatus) -> Result<(), RecordError> {
        if !self.status.can_transition_to(next) {
            return Err(RecordError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn fail(&mut self, error: TipError) -> Result<(), RecordError> {
        self.advance(TipStatus::Error)?;
        self.error = Some(error);
        Ok(())
    }

    /// Setting the same hash twice is a no-op; a different one is refused.
    pub fn set_hash(&mut self, hash: TxHash) -> Result<(), RecordError> {
        match self.tx_hash {
            Some(existing) if existing != hash => Err(RecordError::HashAlreadySet(existing)),
            _ => {
                self.tx_hash = Some(hash);
                self.updated_at = Utc::now();
                Ok(())
            }
        }
    }
}

impl Default for TransactionRecord {
    fn default() -> Self {
        Self::idle()
    }
}
