//! Maps the flow's current record to what the page shows. Nothing here holds
//! state of its own.

use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::config::explorer_tx_url;
use crate::domain::{format_usd, TipStatus, TransactionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Busy,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    None,
    Spinner,
    Check,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub tone: Tone,
    pub icon: Icon,
    pub headline: String,
    pub explorer_url: Option<String>,
}

impl StatusView {
    pub fn from_record(record: &TransactionRecord, explorer_host: &str) -> Self {
        let (tone, icon, headline) = match record.status {
            TipStatus::Idle => (Tone::Neutral, Icon::None, String::new()),
            TipStatus::Preparing => (Tone::Busy, Icon::Spinner, "Preparing your tip...".into()),
            TipStatus::Signing => (
                Tone::Busy,
                Icon::Spinner,
                "Requesting payment signature...".into(),
            ),
            TipStatus::Pending => (Tone::Busy, Icon::Spinner, "Waiting for the network...".into()),
            TipStatus::Confirming => (Tone::Busy, Icon::Spinner, "Confirming transaction...".into()),
            TipStatus::Success => {
                let headline = match &record.tip {
                    Some(tip) => format!(
                        "Successfully sent {} to @{}!",
                        format_usd(&tip.amount),
                        tip.recipient
                    ),
                    None => "Tip sent!".to_string(),
                };
                (Tone::Success, Icon::Check, headline)
            }
            TipStatus::Error => {
                let headline = record
                    .error
                    .as_ref()
                    .map(|e| e.user_message())
                    .unwrap_or("Failed to process tip. Please try again.");
                (Tone::Error, Icon::Alert, headline.to_string())
            }
        };

        Self {
            tone,
            icon,
            headline,
            explorer_url: record
                .tx_hash
                .as_ref()
                .map(|hash| explorer_tx_url(explorer_host, hash)),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.tone != Tone::Neutral
    }
}

/// Text of the send button.
pub fn button_label(status: TipStatus, amount: &BigDecimal, connected: bool) -> String {
    match status {
        TipStatus::Preparing => "Preparing...".to_string(),
        TipStatus::Signing | TipStatus::Pending => "Signing...".to_string(),
        TipStatus::Confirming => "Confirming...".to_string(),
        _ if connected => format!("Send {} Tip", format_usd(amount)),
        _ => "Connect Wallet to Tip".to_string(),
    }
}
