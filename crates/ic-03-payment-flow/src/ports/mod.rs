//! Ports layer for the Payment Flow.
//!
//! - Inbound (Driving) ports: `PaymentApi`
//! - Outbound (Driven) ports: `PaymentBackend` (HTTP), `PaymentWidget`
//!   (provider checkout UI)

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
