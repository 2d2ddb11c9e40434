//! Use cases orchestrate domain logic through the ports.

pub mod send_tip;

pub use send_tip::{FlowError, FlowSettings, StatusUpdate, TipFlow};
