//! # Session Context Service
//!
//! Application service that owns `SessionState`, drives the
//! `SessionBackend` port and implements the `SessionApi` inbound port.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{AuthToken, ClientError, ClientResult, Credentials, SessionEpoch, User};
use tracing::{debug, info, warn};

use crate::domain::{SessionSnapshot, SessionState};
use crate::ports::inbound::SessionApi;
use crate::ports::outbound::{AuthResponse, SessionBackend, SignupRequest};

/// Explicitly passed session container; one per logged-in client.
pub struct SessionContext {
    backend: Arc<dyn SessionBackend>,
    state: RwLock<SessionState>,
}

/// Decrements the in-flight refresh counter even if the refresh future is
/// dropped before completion.
struct RefreshInFlight<'a>(&'a RwLock<SessionState>);

impl<'a> RefreshInFlight<'a> {
    fn start(state: &'a RwLock<SessionState>) -> Self {
        state.write().begin_refresh();
        Self(state)
    }
}

impl Drop for RefreshInFlight<'_> {
    fn drop(&mut self) {
        self.0.write().end_refresh();
    }
}

impl SessionContext {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Logs in with email and password.
    ///
    /// # Errors
    /// - `InvalidInput`: blank email or password
    /// - `AuthRequired`: wrong credentials, or a logout/login happened while
    ///   the request was in flight
    /// - `NetworkOrServer`: transport or server failure
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ClientError::InvalidInput(
                "email and password are required".into(),
            ));
        }
        let started = self.state.read().epoch();
        let result = self.backend.login(email.trim(), password).await;
        self.finish_authentication(started, result, "login")
    }

    /// Creates an account and logs into it.
    pub async fn signup(&self, request: SignupRequest) -> ClientResult<User> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(ClientError::InvalidInput(
                "email and password are required".into(),
            ));
        }
        let started = self.state.read().epoch();
        let result = self.backend.signup(&request).await;
        self.finish_authentication(started, result, "signup")
    }

    /// Installs a session obtained elsewhere (e.g. a persisted token store).
    pub fn restore(&self, user: User, token: AuthToken) -> SessionEpoch {
        let epoch = self.state.write().install(user, token);
        info!(epoch = %epoch, "session restored");
        epoch
    }

    /// Installs a session from a bare token by fetching the profile it
    /// belongs to.
    pub async fn resume(&self, token: AuthToken) -> ClientResult<User> {
        if token.is_empty() {
            return Err(ClientError::AuthRequired);
        }
        let started = self.state.read().epoch();
        let result = self.backend.fetch_profile(&token).await;
        let result = result.map(|user| AuthResponse { user, token });
        self.finish_authentication(started, result, "resume")
    }

    /// Clears token and user. In-flight operations of the ended session
    /// resolve as `AuthRequired` and leave state untouched.
    pub fn logout(&self) {
        let epoch = self.state.write().clear();
        info!(epoch = %epoch, "logged out");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.read().snapshot()
    }

    fn finish_authentication(
        &self,
        started: SessionEpoch,
        result: Result<AuthResponse, shared_types::BackendError>,
        action: &'static str,
    ) -> ClientResult<User> {
        let mut state = self.state.write();
        if state.epoch() != started {
            debug!(action, "discarding authentication result superseded by another session change");
            return Err(ClientError::AuthRequired);
        }
        match result {
            Ok(AuthResponse { user, token }) => {
                let epoch = state.install(user.clone(), token);
                info!(action, user_id = %user.id, credits = user.credits, epoch = %epoch, "session started");
                Ok(user)
            }
            Err(err) => {
                let err = ClientError::from(err);
                warn!(action, error = %err, "authentication failed");
                state.record_error(format!("{action} failed: {err}"));
                Err(err)
            }
        }
    }
}

#[async_trait]
impl SessionApi for SessionContext {
    fn credentials(&self) -> ClientResult<Credentials> {
        self.state.read().credentials()
    }

    fn is_current(&self, epoch: SessionEpoch) -> bool {
        self.state.read().is_current(epoch)
    }

    fn current_user(&self) -> Option<User> {
        self.state.read().user().cloned()
    }

    async fn refresh_credits(&self) -> ClientResult<u64> {
        let credentials = self.credentials()?;
        let in_flight = RefreshInFlight::start(&self.state);
        let result = self.backend.fetch_profile(&credentials.token).await;
        drop(in_flight);

        let mut state = self.state.write();
        match result {
            Ok(user) => match state.apply_profile(credentials.epoch, user) {
                Ok(credits) => {
                    debug!(credits, "credit balance refreshed");
                    Ok(credits)
                }
                Err(err) => {
                    debug!(epoch = %credentials.epoch, "discarding profile for ended session");
                    Err(err)
                }
            },
            Err(_) if !state.is_current(credentials.epoch) => Err(ClientError::AuthRequired),
            Err(err) => {
                let err = ClientError::from(err);
                warn!(error = %err, "credit refresh failed");
                state.record_error(format!("Failed to refresh credits: {err}"));
                Err(err)
            }
        }
    }
}
