//! Session record and key layout.

use chrono::{DateTime, Utc};
use newsroom_core::{SessionId, UserId};
use serde::{Deserialize, Serialize};

/// A live refresh-token session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Refresh token identity.
    pub jti: SessionId,
    /// Owning principal.
    pub user_id: UserId,
    /// Client user agent at the time the token was issued.
    pub user_agent: String,
    /// When the refresh token (and so the session) expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is owned by `user_id`.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Remaining lifetime, or `None` if already past `expires_at`.
    #[must_use]
    pub fn remaining(&self) -> Option<std::time::Duration> {
        (self.expires_at - Utc::now()).to_std().ok().filter(|d| !d.is_zero())
    }
}

pub(crate) const SESSION_KEY_PREFIX: &str = "session:";
pub(crate) const USER_SESSIONS_KEY_PREFIX: &str = "user_sessions:";

/// Key for a session record.
pub(crate) fn session_key(jti: &SessionId) -> String {
    format!("{SESSION_KEY_PREFIX}{jti}")
}

/// Key for a principal's set of session ids.
pub(crate) fn user_sessions_key(user_id: &UserId) -> String {
    format!("{USER_SESSIONS_KEY_PREFIX}{user_id}")
}
