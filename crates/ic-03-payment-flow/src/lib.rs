//! # Payment Flow Component
//!
//! Credit top-ups. The client never grants credits itself: it creates an
//! order, relays the provider's callback to the backend for verification and
//! then re-reads the balance.
//!
//! ## Trust boundaries
//!
//! | Input | Treatment |
//! |-------|-----------|
//! | Create-order response | Authoritative for amount and currency |
//! | Provider callback | Untrusted JSON; validated and matched to the open order |
//! | Verify response | Marks the attempt verified; `credits_added` is informational |
//! | Balance | Only from `SessionApi::refresh_credits` |

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::inbound::PaymentApi;
pub use ports::outbound::{
    PaymentBackend, PaymentWidget, VerifyPaymentRequest, VerifyPaymentResponse, WidgetError,
};
pub use service::{PaymentFlow, ProviderHandler};
