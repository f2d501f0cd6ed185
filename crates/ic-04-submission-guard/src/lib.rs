//! # Submission Guard Component
//!
//! Credit-gated task submission and the `Dashboard` composition that drives
//! all client components for one user.
//!
//! | Balance | Outcome | Backend calls |
//! |---------|---------|---------------|
//! | logged out | `AuthRequired` | none |
//! | `< min_credits` | `InsufficientCredits` | none |
//! | `>= min_credits` | ledger `create_task` | one |
//!
//! The guard never touches the balance; the backend debits it and the next
//! refresh shows the result.

pub mod dashboard;
pub mod domain;
pub mod service;

pub use dashboard::{Dashboard, DashboardView};
pub use domain::*;
pub use service::{SubmissionGuard, DEFAULT_MIN_CREDITS};
