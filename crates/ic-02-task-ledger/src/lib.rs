//! # Task Ledger Component
//!
//! Maintains the user's processing tasks as an id-keyed collection that
//! mirrors the backend, and submits new images for processing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   TaskLedgerApi   ┌──────────────┐   TaskBackend   ┌─────────┐
//! │ Submission Guard│ ─────────────────→│  TaskLedger  │ ───────────────→│ Backend │
//! └─────────────────┘                   └──────┬───────┘                 └─────────┘
//!                                              │ SessionApi
//!                                              ↓
//!                                       ┌──────────────┐
//!                                       │   Session    │
//!                                       └──────────────┘
//! ```
//!
//! ## Invariants
//!
//! - Tasks are identified by id; the collection never holds duplicates.
//! - A task's status only moves forward. Backend reports that would move it
//!   backwards are flagged in `LedgerSnapshot::regressions` and not applied.
//! - A listing issued before an already-applied listing is ignored.
//! - A task created after a listing was issued survives that listing.
//! - Responses for an ended session are dropped.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::inbound::TaskLedgerApi;
pub use ports::outbound::TaskBackend;
pub use service::TaskLedger;
