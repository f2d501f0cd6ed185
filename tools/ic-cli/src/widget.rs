//! Terminal stand-in for the provider's checkout widget.
//!
//! `open` only records the checkout; the command prints the options and reads
//! the provider's callback payload from stdin.

use ic_03_payment_flow::{CheckoutOptions, PaymentWidget, ProviderHandler, WidgetError};
use parking_lot::Mutex;

#[derive(Default)]
pub struct TerminalWidget {
    pending: Mutex<Option<(CheckoutOptions, ProviderHandler)>>,
}

impl TerminalWidget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the most recently opened checkout.
    pub fn take(&self) -> Option<(CheckoutOptions, ProviderHandler)> {
        self.pending.lock().take()
    }
}

impl PaymentWidget for TerminalWidget {
    fn open(&self, options: CheckoutOptions, handler: ProviderHandler) -> Result<(), WidgetError> {
        if options.key.trim().is_empty() {
            return Err(WidgetError::Misconfigured(
                "provider key is not set (IC_PROVIDER_KEY)".into(),
            ));
        }
        *self.pending.lock() = Some((options, handler));
        Ok(())
    }
}
