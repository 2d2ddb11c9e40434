//! Tip request entity and its smallest-unit representation.

use bigdecimal::BigDecimal;
use serde::Serialize;
use std::str::FromStr;

use crate::error::TipError;
use crate::validation::{
    sanitize_string, validate_message, validate_min_amount, validate_positive_amount,
    validate_username,
};

/// Bounds applied when a tip request is constructed.
#[derive(Debug, Clone)]
pub struct TipLimits {
    pub min_amount: BigDecimal,
}

impl Default for TipLimits {
    fn default() -> Self {
        Self {
            min_amount: BigDecimal::from_str("0.1").unwrap_or_else(|_| BigDecimal::from(0)),
        }
    }
}

/// One intended payment, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TipRequest {
    recipient: String,
    amount: BigDecimal,
    message: Option<String>,
}

impl TipRequest {
    pub fn new(
        recipient: &str,
        amount: BigDecimal,
        message: &str,
        limits: &TipLimits,
    ) -> Result<Self, TipError> {
        validate_username(recipient)?;
        validate_positive_amount(&amount)?;
        validate_min_amount(&amount, &limits.min_amount)?;
        validate_message(message)?;

        let recipient = sanitize_string(recipient);
        let recipient = recipient.strip_prefix('@').unwrap_or(&recipient).to_string();
        let message = match message.trim() {
            "" => None,
            _ => Some(message.to_string()),
        };

        Ok(Self {
            recipient,
            amount,
            message,
        })
    }

    /// Streamer handle without the leading `@`.
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> &BigDecimal {
        &self.amount
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Integer amount in the token's smallest unit at a fixed decimal exponent.
/// u128 holds at most 39 decimal digits.
const MAX_WHOLE_DIGITS: i64 = 39;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TipAmountUnit {
    pub value: u128,
    pub decimals: u32,
}

impl TipAmountUnit {
    /// Converts a decimal amount exactly. Digits finer than the token's
    /// precision are dropped, never rounded up.
    pub fn from_decimal(amount: &BigDecimal, decimals: u32) -> Result<Self, TipError> {
        validate_positive_amount(amount)?;

        // Bounds are checked on the raw digits so huge exponents are never expanded.
        let (raw, raw_scale) = amount.as_bigint_and_exponent();
        let len = raw.to_string().trim_start_matches('-').len() as i64;
        if len - raw_scale > MAX_WHOLE_DIGITS {
            return Err(TipError::InvalidAmount(format!(
                "{} does not fit in token units",
                amount
            )));
        }
        if raw_scale - i64::from(decimals) >= len {
            return Err(TipError::InvalidAmount(format!(
                "{} is below the token's smallest unit",
                amount
            )));
        }

        let (digits, scale) = amount.with_scale(i64::from(decimals)).as_bigint_and_exponent();
        debug_assert_eq!(scale, i64::from(decimals));

        let value = digits.to_string().parse::<u128>().map_err(|_| {
            TipError::InvalidAmount(format!("{} does not fit in token units", amount))
        })?;
        if value == 0 {
            return Err(TipError::InvalidAmount(format!(
                "{} is below the token's smallest unit",
                amount
            )));
        }

        Ok(Self { value, decimals })
    }

    pub fn to_decimal(&self) -> BigDecimal {
        BigDecimal::from_str(&format!("{}e-{}", self.value, self.decimals))
            .unwrap_or_else(|_| BigDecimal::from(0))
    }
}

/// `$1.00` style rendering used in status and button texts.
pub fn format_usd(amount: &BigDecimal) -> String {
    format!("${}", amount.round(2).with_scale(2))
}
