use serde::Serialize;
use thiserror::Error;

/// Failure taxonomy of a single tip attempt.
///
/// Every failure raised while submitting a tip is folded into one of these
/// variants at the flow boundary. The detail strings are for logs only;
/// users only ever see [`TipError::user_message`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TipError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("User rejected the signature request")]
    UserRejected,

    #[error("Payment required: {0}")]
    PaymentRequired(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Network or unknown error: {0}")]
    NetworkOrUnknown(String),
}

impl TipError {
    /// Short, non-technical text shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            TipError::InvalidAmount(_) => "Please select a valid tip amount.",
            TipError::WalletNotConnected => "Please connect your wallet first.",
            TipError::UserRejected => "Transaction was rejected. Please try again.",
            TipError::PaymentRequired(_) => {
                "Insufficient balance for this tip. Please top up your wallet and try again."
            }
            TipError::BadRequest(_) => "Invalid request. Please check your input.",
            TipError::NetworkOrUnknown(_) => "Failed to process tip. Please try again.",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TipError::InvalidAmount(_) => "invalid_amount",
            TipError::WalletNotConnected => "wallet_not_connected",
            TipError::UserRejected => "user_rejected",
            TipError::PaymentRequired(_) => "payment_required",
            TipError::BadRequest(_) => "bad_request",
            TipError::NetworkOrUnknown(_) => "network_or_unknown",
        }
    }
}

impl From<crate::validation::ValidationError> for TipError {
    fn from(err: crate::validation::ValidationError) -> Self {
        match err.field {
            "amount" => TipError::InvalidAmount(err.message),
            _ => TipError::BadRequest(err.to_string()),
        }
    }
}
