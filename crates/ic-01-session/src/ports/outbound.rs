//! Outbound (Driven) ports for the Session Context.
//!
//! Implemented by the HTTP adapter against `/auth/*` and `/users/me`.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{AuthToken, BackendError, User};

/// Body returned by login and signup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: AuthToken,
}

/// Account creation request.
#[derive(Clone, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Authentication and profile endpoints.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// `POST /auth/login` with form fields `username` and `password`.
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError>;

    /// `POST /auth/signup`.
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, BackendError>;

    /// `GET /users/me`: the authoritative profile including the balance.
    async fn fetch_profile(&self, token: &AuthToken) -> Result<User, BackendError>;
}

/// Mock backend for testing.
#[cfg(test)]
pub struct MockSessionBackend {
    pub profile: parking_lot::Mutex<Result<User, BackendError>>,
    pub login_result: parking_lot::Mutex<Result<AuthResponse, BackendError>>,
    pub profile_calls: std::sync::atomic::AtomicUsize,
    pub profile_gate: Option<std::sync::Arc<tokio::sync::Notify>>,
}

#[cfg(test)]
impl MockSessionBackend {
    pub fn new(user: User, token: &str) -> Self {
        Self {
            profile: parking_lot::Mutex::new(Ok(user.clone())),
            login_result: parking_lot::Mutex::new(Ok(AuthResponse {
                user,
                token: AuthToken::new(token),
            })),
            profile_calls: std::sync::atomic::AtomicUsize::new(0),
            profile_gate: None,
        }
    }

    pub fn with_gate(mut self, gate: std::sync::Arc<tokio::sync::Notify>) -> Self {
        self.profile_gate = Some(gate);
        self
    }

    pub fn set_profile(&self, profile: Result<User, BackendError>) {
        *self.profile.lock() = profile;
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SessionBackend for MockSessionBackend {
    async fn login(&self, _email: &str, _password: &str) -> Result<AuthResponse, BackendError> {
        self.login_result.lock().clone()
    }

    async fn signup(&self, _request: &SignupRequest) -> Result<AuthResponse, BackendError> {
        self.login_result.lock().clone()
    }

    async fn fetch_profile(&self, _token: &AuthToken) -> Result<User, BackendError> {
        self.profile_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(gate) = &self.profile_gate {
            gate.notified().await;
        }
        self.profile.lock().clone()
    }
}
