//! # Payment Attempt State Machine
//!
//! ```text
//! [idle] → [creating-order] → [order-created] → [awaiting-provider] → [verifying] → [verified]
//!                │                   │                  │                  │
//!                └───────────────────┴──────────────────┴──────────────────┴──→ [failed]
//! ```
//!
//! Only one attempt is current. Starting a new attempt supersedes the
//! current one unless it is mid-request (`creating-order`, `verifying`).

use std::fmt;

use shared_types::{ClientError, ClientResult, OrderId, OrderStatus, PaymentOrder, SessionEpoch};

use super::callback::ProviderCallback;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStage {
    Idle,
    CreatingOrder,
    OrderCreated,
    AwaitingProvider,
    Verifying,
    Verified,
    Failed,
}

impl PaymentStage {
    /// A backend request or widget hand-off is in progress.
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::CreatingOrder | Self::OrderCreated | Self::Verifying)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAttempt {
    pub id: AttemptId,
    pub requested_amount: u64,
    pub epoch: SessionEpoch,
    pub stage: PaymentStage,
    pub order: Option<PaymentOrder>,
    pub error: Option<String>,
    pub credits_added: Option<u64>,
}

impl PaymentAttempt {
    /// Status of the order, once one exists.
    pub fn order_status(&self) -> Option<OrderStatus> {
        self.order.as_ref()?;
        match self.stage {
            PaymentStage::Idle | PaymentStage::CreatingOrder => None,
            PaymentStage::OrderCreated => Some(OrderStatus::Created),
            PaymentStage::AwaitingProvider => Some(OrderStatus::AwaitingProvider),
            PaymentStage::Verifying => Some(OrderStatus::Verifying),
            PaymentStage::Verified => Some(OrderStatus::Verified),
            PaymentStage::Failed => Some(OrderStatus::Failed),
        }
    }
}

/// Result of a verified top-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub order_id: OrderId,
    pub payment_id: String,
    pub message: String,
    /// As reported by the verify endpoint. Informational only.
    pub credits_added: u64,
    /// Balance from the follow-up authoritative refresh, if it succeeded.
    pub balance: Option<u64>,
}

/// Observable payment state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSnapshot {
    pub attempt: Option<AttemptId>,
    pub stage: PaymentStage,
    pub order: Option<PaymentOrder>,
    pub order_status: Option<OrderStatus>,
    pub error: Option<String>,
    pub credits_added: Option<u64>,
}

impl PaymentSnapshot {
    pub fn loading(&self) -> bool {
        self.stage.is_busy()
    }
}

#[derive(Debug, Default)]
pub struct PaymentState {
    last_id: u64,
    current: Option<PaymentAttempt>,
}

impl PaymentState {
    /// Starts a new attempt in `creating-order`.
    ///
    /// # Errors
    /// - `Busy`: the current attempt is mid-request
    pub fn begin(&mut self, requested_amount: u64, epoch: SessionEpoch) -> ClientResult<AttemptId> {
        if self.current.as_ref().is_some_and(|a| a.stage.is_busy()) {
            return Err(ClientError::Busy);
        }
        self.last_id += 1;
        let id = AttemptId(self.last_id);
        self.current = Some(PaymentAttempt {
            id,
            requested_amount,
            epoch,
            stage: PaymentStage::CreatingOrder,
            order: None,
            error: None,
            credits_added: None,
        });
        Ok(id)
    }

    pub fn current(&self) -> Option<&PaymentAttempt> {
        self.current.as_ref()
    }

    fn attempt_in(&mut self, id: AttemptId, stage: PaymentStage) -> ClientResult<&mut PaymentAttempt> {
        match self.current.as_mut() {
            Some(attempt) if attempt.id == id && attempt.stage == stage => Ok(attempt),
            _ => Err(ClientError::StaleAttempt),
        }
    }

    pub fn order_created(&mut self, id: AttemptId, order: PaymentOrder) -> ClientResult<()> {
        let attempt = self.attempt_in(id, PaymentStage::CreatingOrder)?;
        attempt.order = Some(order);
        attempt.stage = PaymentStage::OrderCreated;
        Ok(())
    }

    pub fn awaiting_provider(&mut self, id: AttemptId) -> ClientResult<()> {
        self.attempt_in(id, PaymentStage::OrderCreated)?.stage = PaymentStage::AwaitingProvider;
        Ok(())
    }

    /// Moves an attempt to `verifying` if the callback matches its order.
    ///
    /// A malformed or mismatched callback fails the attempt.
    ///
    /// # Errors
    /// - `StaleAttempt`: `id` is not the current attempt awaiting the provider
    /// - `VerificationRejected`: malformed payload or order id mismatch
    pub fn begin_verification(
        &mut self,
        id: AttemptId,
        callback: ClientResult<ProviderCallback>,
    ) -> ClientResult<(SessionEpoch, ProviderCallback)> {
        let attempt = self.attempt_in(id, PaymentStage::AwaitingProvider)?;
        let expected = attempt.order.as_ref().map(|o| o.order_id.clone());

        let checked = callback.and_then(|callback| match expected {
            Some(expected) if expected == callback.order_id => Ok(callback),
            Some(expected) => Err(ClientError::VerificationRejected(format!(
                "provider callback is for order {}, expected {expected}",
                callback.order_id
            ))),
            None => Err(ClientError::StaleAttempt),
        });

        match checked {
            Ok(callback) => {
                attempt.stage = PaymentStage::Verifying;
                Ok((attempt.epoch, callback))
            }
            Err(err) => {
                attempt.stage = PaymentStage::Failed;
                attempt.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn verified(&mut self, id: AttemptId, credits_added: u64) -> ClientResult<()> {
        let attempt = self.attempt_in(id, PaymentStage::Verifying)?;
        attempt.stage = PaymentStage::Verified;
        attempt.credits_added = Some(credits_added);
        attempt.error = None;
        Ok(())
    }

    /// Fails the attempt if it is still current and not already terminal.
    /// Returns whether anything changed.
    pub fn fail(&mut self, id: AttemptId, message: impl Into<String>) -> bool {
        match self.current.as_mut() {
            Some(attempt) if attempt.id == id && !attempt.stage.is_terminal() => {
                attempt.stage = PaymentStage::Failed;
                attempt.error = Some(message.into());
                true
            }
            _ => false,
        }
    }

    /// Fails the attempt only if it is still current and mid-request.
    ///
    /// Used when the future driving a request is dropped; an attempt that has
    /// already reached `awaiting-provider` or a terminal stage is left as is.
    pub fn abandon(&mut self, id: AttemptId, message: impl Into<String>) -> bool {
        match self.current.as_mut() {
            Some(attempt) if attempt.id == id && attempt.stage.is_busy() => {
                attempt.stage = PaymentStage::Failed;
                attempt.error = Some(message.into());
                true
            }
            _ => false,
        }
    }

    /// Back to `idle`. Outstanding handlers become stale.
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn snapshot(&self) -> PaymentSnapshot {
        match &self.current {
            Some(attempt) => PaymentSnapshot {
                attempt: Some(attempt.id),
                stage: attempt.stage,
                order: attempt.order.clone(),
                order_status: attempt.order_status(),
                error: attempt.error.clone(),
                credits_added: attempt.credits_added,
            },
            None => PaymentSnapshot {
                attempt: None,
                stage: PaymentStage::Idle,
                order: None,
                order_status: None,
                error: None,
                credits_added: None,
            },
        }
    }
}
