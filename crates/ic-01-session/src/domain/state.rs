//! Session state and its transitions.

use shared_types::{AuthToken, ClientError, ClientResult, Credentials, SessionEpoch, User};

/// The logged-in user together with the token that authenticates them.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub user: User,
    pub token: AuthToken,
}

/// Mutable session bookkeeping guarded by `SessionContext`.
#[derive(Debug, Default)]
pub struct SessionState {
    active: Option<ActiveSession>,
    epoch: SessionEpoch,
    refreshes_in_flight: usize,
    last_error: Option<String>,
}

impl SessionState {
    /// Installs a new session and starts a new epoch.
    pub fn install(&mut self, user: User, token: AuthToken) -> SessionEpoch {
        self.epoch = self.epoch.next();
        self.active = Some(ActiveSession { user, token });
        self.last_error = None;
        self.epoch
    }

    /// Drops the session and starts a new epoch. Idempotent apart from the
    /// epoch bump.
    pub fn clear(&mut self) -> SessionEpoch {
        self.epoch = self.epoch.next();
        self.active = None;
        self.last_error = None;
        self.epoch
    }

    pub fn epoch(&self) -> SessionEpoch {
        self.epoch
    }

    /// True while the session that issued a request at `epoch` is still the
    /// active one.
    pub fn is_current(&self, epoch: SessionEpoch) -> bool {
        self.active.is_some() && self.epoch == epoch
    }

    pub fn credentials(&self) -> ClientResult<Credentials> {
        match &self.active {
            Some(active) if !active.token.is_empty() => Ok(Credentials {
                token: active.token.clone(),
                epoch: self.epoch,
            }),
            _ => Err(ClientError::AuthRequired),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.active.as_ref().map(|a| &a.user)
    }

    /// Replaces the user (and with it the credit balance) with the backend's
    /// view, if the profile was requested under the current epoch.
    ///
    /// Last write wins: no comparison with the previous balance is made.
    pub fn apply_profile(&mut self, epoch: SessionEpoch, user: User) -> ClientResult<u64> {
        if !self.is_current(epoch) {
            return Err(ClientError::AuthRequired);
        }
        let credits = user.credits;
        if let Some(active) = self.active.as_mut() {
            active.user = user;
        }
        self.last_error = None;
        Ok(credits)
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn begin_refresh(&mut self) {
        self.refreshes_in_flight += 1;
    }

    pub fn end_refresh(&mut self) {
        self.refreshes_in_flight = self.refreshes_in_flight.saturating_sub(1);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user().cloned(),
            epoch: self.epoch,
            refreshing: self.refreshes_in_flight > 0,
            error: self.last_error.clone(),
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub epoch: SessionEpoch,
    pub refreshing: bool,
    pub error: Option<String>,
}

impl SessionSnapshot {
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// Balance shown to the user; zero when logged out.
    pub fn credits(&self) -> u64 {
        self.user.as_ref().map(|u| u.credits).unwrap_or(0)
    }
}
