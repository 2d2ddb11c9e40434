//! Framework-agnostic entities of the tip flow.

pub mod address;
pub mod context;
pub mod tip;
pub mod transaction;

pub use address::{Address, HexIdError, TxHash};
pub use context::{ClientInfo, ContextUser, MiniAppContext};
pub use tip::{format_usd, TipAmountUnit, TipLimits, TipRequest};
pub use transaction::{RecordError, TipStatus, TipSummary, TransactionRecord};
