//! # Error Types
//!
//! Defines the error kinds shared by all components.
//!
//! Adapters report `BackendError`; components surface `ClientError`.

use thiserror::Error;

use crate::entities::{TaskId, TaskStatus};

/// Errors reported by a backend adapter for a single HTTP call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// 401/403: the token is missing, expired or not accepted.
    #[error("not authenticated")]
    Unauthorized,

    /// Any other 4xx: the backend understood and refused the request.
    #[error("request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// Connection failures, timeouts and 5xx responses.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Errors surfaced by the client core to its caller.
///
/// Every variant leaves the component that produced it in its previous
/// valid state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Missing or expired token, or the session ended while the call was in
    /// flight. Never retried.
    #[error("authentication required")]
    AuthRequired,

    /// Client-side pre-check failed; no backend call was made.
    #[error("Not enough credits to process image (have {available}, need {required})")]
    InsufficientCredits { available: u64, required: u64 },

    /// Transport, server or decoding failure of a fetch/create/verify call.
    #[error("network or server error: {0}")]
    NetworkOrServer(String),

    /// The backend (or local validation) refused a provider callback.
    #[error("payment verification rejected: {0}")]
    VerificationRejected(String),

    /// A payment attempt is already creating an order or verifying.
    #[error("a payment attempt is already in progress")]
    Busy,

    /// A provider callback arrived for an attempt that is no longer current.
    #[error("provider callback belongs to a superseded payment attempt")]
    StaleAttempt,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// True when the caller should send the user back to login.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::AuthRequired)
    }
}

impl From<BackendError> for ClientError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unauthorized => Self::AuthRequired,
            other => Self::NetworkOrServer(other.to_string()),
        }
    }
}

/// Convenience alias used across the component crates.
pub type ClientResult<T> = Result<T, ClientError>;

/// A backend task record that violates the task invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskInvariantError {
    #[error("task {id} is completed but has no result path")]
    MissingResultPath { id: TaskId },

    #[error("task {id} is {status} but carries a result path")]
    UnexpectedResultPath { id: TaskId, status: TaskStatus },

    #[error("task {id} failed without an error message")]
    MissingErrorMessage { id: TaskId },

    #[error("task {id} is {status} but carries an error message")]
    UnexpectedErrorMessage { id: TaskId, status: TaskStatus },
}
