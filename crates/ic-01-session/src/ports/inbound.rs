//! # Inbound Port - SessionApi
//!
//! The view of the session that the task ledger, payment flow and submission
//! guard depend on.
//!
//! | Method | Caller |
//! |--------|--------|
//! | `credentials` | Task Ledger, Payment Flow (per request) |
//! | `is_current` | Task Ledger, Payment Flow (per response) |
//! | `current_user` / `credits` | Submission Guard, Payment Flow (prefill) |
//! | `refresh_credits` | Payment Flow (after verification), composition layer |

use async_trait::async_trait;
use shared_types::{ClientResult, Credentials, SessionEpoch, User};

#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Token and epoch for a request about to be issued.
    ///
    /// # Errors
    /// - `AuthRequired`: nobody is logged in
    fn credentials(&self) -> ClientResult<Credentials>;

    /// Whether a response to a request issued under `epoch` may be applied.
    fn is_current(&self, epoch: SessionEpoch) -> bool;

    fn current_user(&self) -> Option<User>;

    /// Locally known balance, `None` when logged out.
    fn credits(&self) -> Option<u64> {
        self.current_user().map(|user| user.credits)
    }

    /// Re-fetches the authoritative balance and replaces the local value.
    ///
    /// Idempotent; concurrent calls are safe and the last response wins.
    async fn refresh_credits(&self) -> ClientResult<u64>;
}
