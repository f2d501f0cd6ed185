//! Outbound (Driven) ports for the Payment Flow.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{AuthToken, BackendError, OrderId, PaymentOrder};
use thiserror::Error;

use crate::domain::CheckoutOptions;
use crate::service::ProviderHandler;

/// Body of `POST /payments/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyPaymentRequest {
    pub order_id: OrderId,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyPaymentResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub credits_added: u64,
}

/// Payment endpoints of the backend.
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    /// `POST /payments/create`.
    async fn create_order(&self, token: &AuthToken, amount: u64)
        -> Result<PaymentOrder, BackendError>;

    /// `POST /payments/verify`. The only call that grants credits.
    async fn verify_payment(
        &self,
        token: &AuthToken,
        request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, BackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    #[error("payment widget unavailable: {0}")]
    Unavailable(String),

    #[error("payment widget misconfigured: {0}")]
    Misconfigured(String),
}

/// The provider's checkout UI.
///
/// `open` returns once the widget is shown. The widget keeps `handler` and
/// calls `ProviderHandler::complete` at most once, when the user finishes
/// paying. A dismissed widget simply drops it.
pub trait PaymentWidget: Send + Sync {
    fn open(&self, options: CheckoutOptions, handler: ProviderHandler) -> Result<(), WidgetError>;
}

/// Mock payment backend for testing.
#[cfg(test)]
pub struct MockPaymentBackend {
    pub order: parking_lot::Mutex<Result<PaymentOrder, BackendError>>,
    pub verify: parking_lot::Mutex<Result<VerifyPaymentResponse, BackendError>>,
    pub verify_requests: parking_lot::Mutex<Vec<VerifyPaymentRequest>>,
    pub create_calls: std::sync::atomic::AtomicUsize,
    pub create_gate: Option<std::sync::Arc<tokio::sync::Notify>>,
    pub verify_gate: Option<std::sync::Arc<tokio::sync::Notify>>,
}

#[cfg(test)]
impl MockPaymentBackend {
    pub fn new(order_id: &str, amount: u64) -> Self {
        Self {
            order: parking_lot::Mutex::new(Ok(PaymentOrder {
                order_id: OrderId::new(order_id),
                amount,
                currency: "INR".into(),
            })),
            verify: parking_lot::Mutex::new(Ok(VerifyPaymentResponse {
                message: "Payment verified successfully".into(),
                credits_added: amount / 100,
            })),
            verify_requests: parking_lot::Mutex::new(Vec::new()),
            create_calls: std::sync::atomic::AtomicUsize::new(0),
            create_gate: None,
            verify_gate: None,
        }
    }

    pub fn with_create_gate(mut self, gate: std::sync::Arc<tokio::sync::Notify>) -> Self {
        self.create_gate = Some(gate);
        self
    }

    pub fn with_verify_gate(mut self, gate: std::sync::Arc<tokio::sync::Notify>) -> Self {
        self.verify_gate = Some(gate);
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_requests.lock().len()
    }
}

#[cfg(test)]
#[async_trait]
impl PaymentBackend for MockPaymentBackend {
    async fn create_order(
        &self,
        _token: &AuthToken,
        _amount: u64,
    ) -> Result<PaymentOrder, BackendError> {
        self.create_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(gate) = &self.create_gate {
            gate.notified().await;
        }
        self.order.lock().clone()
    }

    async fn verify_payment(
        &self,
        _token: &AuthToken,
        request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, BackendError> {
        self.verify_requests.lock().push(request.clone());
        if let Some(gate) = &self.verify_gate {
            gate.notified().await;
        }
        self.verify.lock().clone()
    }
}

/// Widget that keeps every handler it is given.
#[cfg(test)]
#[derive(Default)]
pub struct MockWidget {
    pub opened: parking_lot::Mutex<Vec<(CheckoutOptions, ProviderHandler)>>,
    pub fail_with: parking_lot::Mutex<Option<WidgetError>>,
}

#[cfg(test)]
impl MockWidget {
    pub fn take_handler(&self) -> Option<ProviderHandler> {
        self.opened.lock().pop().map(|(_, handler)| handler)
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }
}

#[cfg(test)]
impl PaymentWidget for MockWidget {
    fn open(&self, options: CheckoutOptions, handler: ProviderHandler) -> Result<(), WidgetError> {
        if let Some(err) = self.fail_with.lock().clone() {
            return Err(err);
        }
        self.opened.lock().push((options, handler));
        Ok(())
    }
}
