pub mod submitter;
pub mod tracker;

pub use submitter::{DirectTransferBackend, DispatchReceipt, HttpTipBackend, TipBackend, TipDispatch};
pub use tracker::{ConfirmationStatus, TrackError, TransactionTracker};
