//! # Session Context
//!
//! **Component ID:** 1
//! **Role:** leaf state container read by every other component
//!
//! ## Purpose
//!
//! Holds the current user identity, the bearer token and the credit balance
//! used for gating submissions. The balance is server-authoritative: it is
//! replaced wholesale by `refresh_credits()` and never adjusted locally.
//!
//! ## Lifecycle
//!
//! ```text
//! [logged out] ──login/signup/restore──→ [active(epoch n)]
//!      ↑                                      │
//!      └──────────────logout──────────────────┘   (epoch n+1)
//! ```
//!
//! Every login and logout bumps the session epoch. Components capture
//! `Credentials { token, epoch }` when they issue a request and apply the
//! response only if `is_current(epoch)` still holds, so a logout makes every
//! in-flight operation resolve as `AuthRequired` without touching state.
//!
//! ## Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Credits never negative | `shared_types::User::credits` is `u64`, decoded strictly |
//! | Credits never changed locally | `domain/state.rs` - only `apply_profile()` replaces the user |
//! | Stale responses dropped | `domain/state.rs` - epoch check in `apply_profile()` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ports/inbound.rs  - SessionApi (used by ledger, payments, guard)
//! ports/outbound.rs - SessionBackend (login, signup, profile)
//! domain/state.rs   - SessionState, SessionSnapshot
//! service.rs        - SessionContext
//! ```

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::*;
pub use service::SessionContext;
