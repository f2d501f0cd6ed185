//! # Inbound Port - PaymentApi

use async_trait::async_trait;
use shared_types::{ClientResult, PaymentOrder};

use crate::domain::PaymentSnapshot;

#[async_trait]
pub trait PaymentApi: Send + Sync {
    /// Creates an order for `amount` and opens the payment widget for it.
    ///
    /// Returns once the widget is open; verification happens later through
    /// the handler given to the widget.
    ///
    /// # Errors
    /// - `InvalidInput`: zero amount
    /// - `AuthRequired`: no session, or the session changed mid-flight
    /// - `Busy`: another attempt is creating an order or verifying
    /// - `NetworkOrServer`: order creation failed or the widget could not open
    async fn create_payment(&self, amount: u64) -> ClientResult<PaymentOrder>;

    /// Abandons the current attempt.
    fn reset(&self);

    fn snapshot(&self) -> PaymentSnapshot;
}
