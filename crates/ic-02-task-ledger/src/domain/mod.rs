//! # Domain Layer - Task Ledger
//!
//! ## Components
//!
//! - `collection`: id-keyed task collection and listing reconciliation
//! - `upload`: image payload packaged for submission

pub mod collection;
pub mod upload;

pub use collection::*;
pub use upload::*;
