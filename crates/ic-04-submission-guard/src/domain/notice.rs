//! User-facing outcome messages.

use std::fmt;

use ic_03_payment_flow::PaymentReceipt;
use shared_types::{ClientError, ClientResult, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// A toast-style notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            title: "Success".to_string(),
            description: description.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            description: description.into(),
            severity: Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn for_submission(outcome: &ClientResult<Task>) -> Self {
        match outcome {
            Ok(_) => Self::success("Image uploaded successfully"),
            Err(ClientError::InsufficientCredits { .. }) => {
                Self::error("Not enough credits to process image")
            }
            Err(ClientError::AuthRequired) => Self::error("Please log in to upload images"),
            Err(_) => Self::error("Failed to upload image"),
        }
    }

    /// Notice for the outcome of `ProviderHandler::complete`, which only
    /// runs once the order exists.
    pub fn for_payment(outcome: &ClientResult<PaymentReceipt>) -> Self {
        match outcome {
            Ok(receipt) => Self::success(format!(
                "Payment verified, {} credits added",
                receipt.credits_added
            )),
            Err(ClientError::VerificationRejected(_)) => {
                Self::error("Payment verification failed")
            }
            Err(ClientError::StaleAttempt) => Self::error("This payment was replaced by a newer one"),
            Err(ClientError::AuthRequired) => {
                Self::error("Please log in again to finish verifying your payment")
            }
            Err(_) => Self::error("Payment verification failed"),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}
