//! # Domain Layer - Payment Flow
//!
//! - `state`: attempt state machine
//! - `callback`: validation of the untrusted provider payload
//! - `checkout`: options handed to the payment widget

pub mod callback;
pub mod checkout;
pub mod state;

pub use callback::*;
pub use checkout::*;
pub use state::*;
