//! Ports layer for the Task Ledger.
//!
//! - Inbound (Driving) ports: `TaskLedgerApi`, used by the submission guard
//! - Outbound (Driven) ports: `TaskBackend`, implemented by the HTTP adapter

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
