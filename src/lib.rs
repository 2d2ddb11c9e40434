pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod form;
pub mod ports;
pub mod presenter;
pub mod services;
pub mod startup;
pub mod use_cases;
pub mod utils;
pub mod validation;
pub mod x402;

pub use config::Config;
pub use error::TipError;
pub use use_cases::send_tip::{FlowError, FlowSettings, StatusUpdate, TipFlow};
