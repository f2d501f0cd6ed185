//! # Submission Guard
//!
//! Client-side credit pre-check in front of `TaskLedgerApi::create_task`.
//! The check only saves a round trip: the backend re-validates and
//! decrements the balance atomically, so two submissions racing past the
//! check are resolved there.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ic_01_session::SessionApi;
use ic_02_task_ledger::{ImageUpload, TaskLedgerApi};
use shared_types::{ClientError, ClientResult, Task};
use tracing::{debug, info};

use crate::domain::Notice;

/// Credits a task costs unless configured otherwise.
pub const DEFAULT_MIN_CREDITS: u64 = 1;

pub struct SubmissionGuard {
    session: Arc<dyn SessionApi>,
    ledger: Arc<dyn TaskLedgerApi>,
    min_credits: u64,
    uploads_in_flight: AtomicUsize,
}

struct Uploading<'a>(&'a AtomicUsize);

impl<'a> Uploading<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Uploading<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SubmissionGuard {
    pub fn new(session: Arc<dyn SessionApi>, ledger: Arc<dyn TaskLedgerApi>) -> Self {
        Self {
            session,
            ledger,
            min_credits: DEFAULT_MIN_CREDITS,
            uploads_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_min_credits(mut self, min_credits: u64) -> Self {
        self.min_credits = min_credits;
        self
    }

    pub fn min_credits(&self) -> u64 {
        self.min_credits
    }

    /// Checks the locally known balance.
    ///
    /// # Errors
    /// - `AuthRequired`: nobody is logged in
    /// - `InsufficientCredits`: balance below the threshold
    pub fn check(&self) -> ClientResult<u64> {
        let available = self.session.credits().ok_or(ClientError::AuthRequired)?;
        if available < self.min_credits {
            return Err(ClientError::InsufficientCredits {
                available,
                required: self.min_credits,
            });
        }
        Ok(available)
    }

    /// Submits an image if the balance allows it. A refused submission makes
    /// no backend call.
    pub async fn submit(&self, image: ImageUpload, metadata: Option<String>) -> ClientResult<Task> {
        let available = match self.check() {
            Ok(available) => available,
            Err(err) => {
                debug!(error = %err, file = image.file_name(), "submission refused before upload");
                return Err(err);
            }
        };

        let _uploading = Uploading::start(&self.uploads_in_flight);
        info!(file = image.file_name(), bytes = image.len(), available, "uploading image");
        self.ledger.create_task(image, metadata).await
    }

    /// `submit` plus the notice to show for its outcome.
    pub async fn submit_with_notice(
        &self,
        image: ImageUpload,
        metadata: Option<String>,
    ) -> (ClientResult<Task>, Notice) {
        let outcome = self.submit(image, metadata).await;
        let notice = Notice::for_submission(&outcome);
        (outcome, notice)
    }

    pub fn is_uploading(&self) -> bool {
        self.uploads_in_flight.load(Ordering::SeqCst) > 0
    }
}
