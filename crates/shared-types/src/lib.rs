//! # Shared Types Crate
//!
//! This crate contains the domain entities, session credentials and error
//! kinds used by every component of the client core.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Task`, `User` and `PaymentOrder` are defined
//!   once and decoded from the backend's JSON here.
//! - **Invariants at the boundary**: a `Task` can only be built from a
//!   `TaskRecord` that satisfies the result/error invariants, so no component
//!   ever holds an inconsistent task.
//! - **Server-authoritative credits**: `User::credits` is unsigned and has no
//!   mutators; it changes only when a whole `User` is replaced.

pub mod entities;
pub mod errors;
pub mod session;

pub use entities::*;
pub use errors::*;
pub use session::*;
