//! Ports layer for the Session Context.
//!
//! - Inbound (Driving) ports: `SessionApi`, consumed by the other components
//! - Outbound (Driven) ports: `SessionBackend`, implemented by the HTTP adapter

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
