//! # Payment Flow Service
//!
//! Drives one top-up attempt at a time:
//!
//! 1. `create_payment` creates an order and opens the widget with a
//!    `ProviderHandler` bound to that attempt.
//! 2. The widget later calls `ProviderHandler::complete` with the provider's
//!    payload, which is validated and relayed to the verify endpoint.
//! 3. On verification the balance is re-fetched through the session. The
//!    balance is never adjusted locally.

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use ic_01_session::SessionApi;
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{BackendError, ClientError, ClientResult, OrderId, PaymentOrder};
use tracing::{debug, info, warn};

use crate::domain::{
    AttemptId, CheckoutConfig, CheckoutOptions, PaymentReceipt, PaymentSnapshot, PaymentState,
    ProviderCallback,
};
use crate::ports::inbound::PaymentApi;
use crate::ports::outbound::{PaymentBackend, PaymentWidget, VerifyPaymentRequest};

struct Inner {
    backend: Arc<dyn PaymentBackend>,
    widget: Arc<dyn PaymentWidget>,
    session: Arc<dyn SessionApi>,
    checkout: CheckoutConfig,
    state: Mutex<PaymentState>,
}

/// Fails its attempt on drop if the attempt is still mid-request, which only
/// happens when the future driving the request is dropped.
struct Interrupted<'a> {
    state: &'a Mutex<PaymentState>,
    attempt: AttemptId,
}

impl Drop for Interrupted<'_> {
    fn drop(&mut self) {
        if self
            .state
            .lock()
            .abandon(self.attempt, "Payment interrupted before completion")
        {
            warn!(attempt = %self.attempt, "payment request dropped mid-flight, attempt failed");
        }
    }
}

/// Cheap to clone; clones share one attempt state.
#[derive(Clone)]
pub struct PaymentFlow {
    inner: Arc<Inner>,
}

impl PaymentFlow {
    pub fn new(
        backend: Arc<dyn PaymentBackend>,
        widget: Arc<dyn PaymentWidget>,
        session: Arc<dyn SessionApi>,
        checkout: CheckoutConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                widget,
                session,
                checkout,
                state: Mutex::new(PaymentState::default()),
            }),
        }
    }
}

#[async_trait]
impl PaymentApi for PaymentFlow {
    async fn create_payment(&self, amount: u64) -> ClientResult<PaymentOrder> {
        if amount == 0 {
            return Err(ClientError::InvalidInput("top-up amount must be positive".into()));
        }
        let inner = &self.inner;
        let credentials = inner.session.credentials()?;
        let attempt = inner.state.lock().begin(amount, credentials.epoch)?;
        let _interrupted = Interrupted {
            state: &inner.state,
            attempt,
        };
        info!(attempt = %attempt, amount, "creating payment order");

        let result = inner.backend.create_order(&credentials.token, amount).await;

        if !inner.session.is_current(credentials.epoch) {
            inner.state.lock().fail(attempt, "Failed to create payment: session ended");
            return Err(ClientError::AuthRequired);
        }
        let order = match result {
            Ok(order) => order,
            Err(err) => {
                let err = ClientError::from(err);
                warn!(attempt = %attempt, error = %err, "payment order creation failed");
                inner
                    .state
                    .lock()
                    .fail(attempt, format!("Failed to create payment: {err}"));
                return Err(err);
            }
        };

        inner.state.lock().order_created(attempt, order.clone())?;
        let options = CheckoutOptions::new(
            &inner.checkout,
            &order,
            inner.session.current_user().as_ref(),
        );
        let handler = ProviderHandler {
            flow: Arc::downgrade(inner),
            attempt,
            order_id: order.order_id.clone(),
        };
        inner.state.lock().awaiting_provider(attempt)?;

        if let Err(err) = inner.widget.open(options, handler) {
            warn!(attempt = %attempt, order_id = %order.order_id, error = %err, "payment widget failed to open");
            inner
                .state
                .lock()
                .fail(attempt, format!("Failed to create payment: {err}"));
            return Err(ClientError::NetworkOrServer(err.to_string()));
        }

        info!(
            attempt = %attempt,
            order_id = %order.order_id,
            amount = order.amount,
            currency = %order.currency,
            "payment widget opened"
        );
        Ok(order)
    }

    fn reset(&self) {
        self.inner.state.lock().reset();
        debug!("payment flow reset");
    }

    fn snapshot(&self) -> PaymentSnapshot {
        self.inner.state.lock().snapshot()
    }
}

/// Completion callback for one opened widget.
///
/// Consumed by `complete`, so a widget session can deliver at most one
/// payload.
#[must_use = "a dropped handler abandons the payment attempt"]
pub struct ProviderHandler {
    flow: Weak<Inner>,
    attempt: AttemptId,
    order_id: OrderId,
}

impl fmt::Debug for ProviderHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandler")
            .field("attempt", &self.attempt)
            .field("order_id", &self.order_id)
            .finish()
    }
}

impl ProviderHandler {
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Relays the provider's payload to the verify endpoint.
    ///
    /// # Errors
    /// - `StaleAttempt`: the attempt was superseded or reset
    /// - `VerificationRejected`: malformed or mismatched payload (no backend
    ///   call), or the backend refused the payment
    /// - `AuthRequired`: the session ended
    /// - `NetworkOrServer`: the verify call failed
    pub async fn complete(self, payload: Value) -> ClientResult<PaymentReceipt> {
        let Some(inner) = self.flow.upgrade() else {
            return Err(ClientError::StaleAttempt);
        };
        let attempt = self.attempt;

        let parsed = ProviderCallback::parse(&payload);
        let started = inner.state.lock().begin_verification(attempt, parsed);
        let (epoch, callback) = match started {
            Ok(started) => started,
            Err(ClientError::StaleAttempt) => {
                debug!(attempt = %attempt, "ignoring provider callback for superseded attempt");
                return Err(ClientError::StaleAttempt);
            }
            Err(err) => {
                warn!(attempt = %attempt, error = %err, "provider callback rejected");
                return Err(err);
            }
        };
        let _interrupted = Interrupted {
            state: &inner.state,
            attempt,
        };

        let credentials = match inner.session.credentials() {
            Ok(credentials) if credentials.epoch == epoch => credentials,
            _ => {
                inner
                    .state
                    .lock()
                    .fail(attempt, "Payment verification failed: session ended");
                return Err(ClientError::AuthRequired);
            }
        };

        let request = VerifyPaymentRequest {
            order_id: callback.order_id,
            payment_id: callback.payment_id,
            signature: callback.signature,
        };
        info!(attempt = %attempt, order_id = %request.order_id, payment_id = %request.payment_id, "verifying payment");
        let result = inner
            .backend
            .verify_payment(&credentials.token, &request)
            .await;

        if !inner.session.is_current(epoch) {
            inner
                .state
                .lock()
                .fail(attempt, "Payment verification failed: session ended");
            return Err(ClientError::AuthRequired);
        }

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                let err = match err {
                    BackendError::Rejected { detail, .. } => ClientError::VerificationRejected(detail),
                    other => ClientError::from(other),
                };
                warn!(attempt = %attempt, order_id = %request.order_id, error = %err, "payment verification failed");
                inner
                    .state
                    .lock()
                    .fail(attempt, format!("Payment verification failed: {err}"));
                return Err(err);
            }
        };

        inner.state.lock().verified(attempt, response.credits_added)?;
        info!(
            attempt = %attempt,
            order_id = %request.order_id,
            credits_added = response.credits_added,
            "payment verified"
        );

        let balance = match inner.session.refresh_credits().await {
            Ok(balance) => Some(balance),
            Err(err) => {
                warn!(error = %err, "credit refresh after payment failed");
                None
            }
        };

        Ok(PaymentReceipt {
            order_id: request.order_id,
            payment_id: request.payment_id,
            message: response.message,
            credits_added: response.credits_added,
            balance,
        })
    }
}
