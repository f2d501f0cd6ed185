//! # Session Credentials
//!
//! Bearer tokens and the session epoch that ties in-flight calls to the
//! login that started them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque bearer token issued at login.
///
/// `Debug` is redacted so tokens never reach log output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Generation counter bumped on every login and logout.
///
/// A response is applied only if the epoch captured when its request was
/// issued is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionEpoch(pub u64);

impl SessionEpoch {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token plus the epoch it was read under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: AuthToken,
    pub epoch: SessionEpoch,
}
