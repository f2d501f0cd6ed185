//! # Domain Layer - Session Context
//!
//! Pure session bookkeeping with no I/O.

pub mod state;

pub use state::*;
