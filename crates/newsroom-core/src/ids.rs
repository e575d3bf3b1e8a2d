//! Strongly Typed Identifiers
//!
//! Newtype wrappers so a principal id can never be handed to an API that
//! expects a session (token) identity, and vice versa.
//!
//! # Example
//!
//! ```
//! use newsroom_core::{SessionId, UserId};
//!
//! let user = UserId::new();
//! let jti = SessionId::new();
//!
//! fn owner_key(id: UserId) -> String {
//!     format!("user_sessions:{id}")
//! }
//!
//! assert!(owner_key(user).starts_with("user_sessions:"));
//! // owner_key(jti); // This would not compile!
//! # let _ = jti;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Failure to parse an identifier from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {reason}")]
pub struct ParseIdError {
    pub kind: &'static str,
    pub reason: String,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh random (v4) identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0.hyphenated(), f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::try_parse(s.trim()).map(Self).map_err(|e| ParseIdError {
                    kind: stringify!($name),
                    reason: e.to_string(),
                })
            }
        }
    };
}

define_id!(
    /// Identifier of a principal (user account).
    ///
    /// Carried as the `sub` claim of every token and used as the owner key of
    /// the session registry.
    UserId
);

define_id!(
    /// Identity of a refresh token (the `jti` claim).
    ///
    /// Generated from the OS random source at mint time, never derived from
    /// any other field, and used as the session registry key.
    ///
    /// ```
    /// use newsroom_core::SessionId;
    ///
    /// let a = SessionId::new();
    /// let b = SessionId::new();
    /// assert_ne!(a, b);
    /// ```
    SessionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_random_and_hyphenated() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
        assert_eq!(a.to_string().matches('-').count(), 4);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let json = serde_json::to_string(&SessionId::from(uuid)).unwrap();
        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SessionId::from(uuid));
    }

    #[test]
    fn test_parse_invalid_names_the_id_kind() {
        let err = "not-a-uuid".parse::<SessionId>().unwrap_err();
        assert_eq!(err.kind, "SessionId");
        assert!(err.to_string().starts_with("invalid SessionId"));
    }

    #[test]
    fn test_parse_accepts_surrounding_whitespace() {
        let id = UserId::new();
        let parsed: UserId = format!(" {id}\n").parse().unwrap();
        assert_eq!(parsed, id);
    }
}
