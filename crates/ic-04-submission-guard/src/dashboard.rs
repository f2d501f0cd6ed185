//! # Dashboard
//!
//! Wires the session, ledger, payment flow and guard together for one
//! logged-in user, the way a front-end page drives them.

use std::sync::Arc;

use ic_01_session::{SessionApi, SessionContext, SessionSnapshot};
use ic_02_task_ledger::{ImageUpload, LedgerSnapshot, TaskLedgerApi};
use ic_03_payment_flow::{PaymentApi, PaymentSnapshot};
use shared_types::{ClientResult, PaymentOrder, Task};
use tracing::{info, warn};

use crate::domain::Notice;
use crate::service::SubmissionGuard;

/// Everything a front-end renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub session: SessionSnapshot,
    pub ledger: LedgerSnapshot,
    pub payment: PaymentSnapshot,
    pub uploading: bool,
}

pub struct Dashboard {
    session: Arc<SessionContext>,
    ledger: Arc<dyn TaskLedgerApi>,
    payments: Arc<dyn PaymentApi>,
    guard: SubmissionGuard,
}

impl Dashboard {
    pub fn new(
        session: Arc<SessionContext>,
        ledger: Arc<dyn TaskLedgerApi>,
        payments: Arc<dyn PaymentApi>,
        min_credits: u64,
    ) -> Self {
        let guard = SubmissionGuard::new(session.clone(), ledger.clone())
            .with_min_credits(min_credits);
        Self {
            session,
            ledger,
            payments,
            guard,
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn guard(&self) -> &SubmissionGuard {
        &self.guard
    }

    /// Guarded submission. A successful upload is followed by a balance
    /// refresh so the server-side debit becomes visible.
    pub async fn submit(
        &self,
        image: ImageUpload,
        metadata: Option<String>,
    ) -> (ClientResult<Task>, Notice) {
        let (outcome, notice) = self.guard.submit_with_notice(image, metadata).await;
        if outcome.is_ok() {
            if let Err(err) = self.session.refresh_credits().await {
                warn!(error = %err, "credit refresh after upload failed");
            }
        }
        (outcome, notice)
    }

    /// Re-fetches tasks and balance concurrently.
    ///
    /// Both requests run to completion; the first error is returned.
    pub async fn refresh(&self) -> ClientResult<DashboardView> {
        let (tasks, credits) = tokio::join!(self.ledger.fetch_tasks(), self.session.refresh_credits());
        tasks?;
        credits?;
        Ok(self.view())
    }

    pub async fn top_up(&self, amount: u64) -> ClientResult<PaymentOrder> {
        self.payments.create_payment(amount).await
    }

    /// Ends the session and forgets everything that belonged to it.
    pub fn logout(&self) {
        self.session.logout();
        self.ledger.clear();
        self.payments.reset();
        info!("dashboard cleared");
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            session: self.session.snapshot(),
            ledger: self.ledger.snapshot(),
            payment: self.payments.snapshot(),
            uploading: self.guard.is_uploading(),
        }
    }
}
