use bigdecimal::BigDecimal;

use crate::domain::{Address, TipAmountUnit};
use crate::error::TipError;

pub const DEFAULT_TOKEN_ADDRESS: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
pub const DEFAULT_TOKEN_DECIMALS: u32 = 6;
pub const DEFAULT_TOKEN_SYMBOL: &str = "USDC";

/// Stablecoin the tips are paid in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    pub address: Address,
    pub decimals: u32,
    pub symbol: String,
}

impl TokenConfig {
    pub fn to_units(&self, amount: &BigDecimal) -> Result<TipAmountUnit, TipError> {
        TipAmountUnit::from_decimal(amount, self.decimals)
    }
}
