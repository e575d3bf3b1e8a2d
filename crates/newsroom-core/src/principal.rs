//! Principal (user account) model.
//!
//! The user directory owns these records. Authentication components only ever
//! hold read-only copies, and the password hash never leaves the directory
//! except for verification.

use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated identity and its authorization attributes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable principal identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalized (lowercase) email address, unique in the directory.
    pub email: String,
    /// Whether the principal may publish as a verified author.
    pub verified_author: bool,
    /// Avatar image reference.
    pub avatar_url: Option<String>,
    /// Administrative capability flag.
    pub is_admin: bool,
    /// When the account was created.
    pub registered_at: DateTime<Utc>,
    /// PHC-formatted password hash. `None` for external-identity-only accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl Principal {
    /// Whether the account can sign in with a password at all.
    #[must_use]
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Copy of this principal with the password hash stripped.
    #[must_use]
    pub fn without_credentials(&self) -> Self {
        Self {
            password_hash: None,
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("verified_author", &self.verified_author)
            .field("avatar_url", &self.avatar_url)
            .field("is_admin", &self.is_admin)
            .field("registered_at", &self.registered_at)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Fields supplied when creating a principal.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub name: String,
    pub email: String,
    pub verified_author: bool,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub password_hash: Option<String>,
}

/// The complete set of fields a directory update may touch.
///
/// Anything not listed here (id, email, registration time) is immutable
/// through `UserDirectory::update`. `None` leaves a field unchanged; for
/// `avatar_url`, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct PrincipalPatch {
    pub name: Option<String>,
    pub avatar_url: Option<Option<String>>,
    pub verified_author: Option<bool>,
    pub is_admin: Option<bool>,
    pub password_hash: Option<String>,
}

impl PrincipalPatch {
    /// Returns true if applying this patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.avatar_url.is_none()
            && self.verified_author.is_none()
            && self.is_admin.is_none()
            && self.password_hash.is_none()
    }

    /// Apply the patch to a principal in place.
    pub fn apply(self, principal: &mut Principal) {
        if let Some(name) = self.name {
            principal.name = name;
        }
        if let Some(avatar_url) = self.avatar_url {
            principal.avatar_url = avatar_url;
        }
        if let Some(verified_author) = self.verified_author {
            principal.verified_author = verified_author;
        }
        if let Some(is_admin) = self.is_admin {
            principal.is_admin = is_admin;
        }
        if let Some(password_hash) = self.password_hash {
            principal.password_hash = Some(password_hash);
        }
    }
}
