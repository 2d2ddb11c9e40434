pub mod client;
pub mod types;

pub use client::{PaidResponse, PaymentBudget, PaymentClient, PaymentClientError, PaymentEvent, TX_HASH_HEADER};
pub use types::{
    PaymentPayload, PaymentRequiredResponse, PaymentRequirements, SettlementResponse,
    PAYMENT_HEADER, PAYMENT_RESPONSE_HEADER, X402_VERSION,
};
