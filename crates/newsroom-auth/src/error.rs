//! Error types for token and password operations.

use thiserror::Error;

/// Authentication primitive errors.
///
/// Token failures keep their precise kind so callers can log them; anything
/// facing a client should collapse them into a single "not authenticated"
/// answer.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // Token errors
    /// Token `exp` is in the past (beyond the configured leeway).
    #[error("Token has expired")]
    Expired,

    /// Token signature does not match the signing secret.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token is structurally invalid (encoding, JSON, segments).
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Token header names an algorithm other than HS256.
    #[error("Unsupported algorithm: only HS256 is allowed")]
    InvalidAlgorithm,

    /// A claim required for this token kind is absent or unparsable.
    #[error("Missing or invalid claim: {0}")]
    MissingClaim(String),

    /// An access token was presented where a refresh token is required, or
    /// the other way round.
    #[error("Unexpected token kind: expected {expected}, got {actual}")]
    WrongKind {
        expected: &'static str,
        actual: &'static str,
    },

    /// Token lifetime pushes `exp` outside the representable range.
    #[error("Token lifetime out of range: {0}")]
    InvalidTtl(String),

    // Key errors
    /// Signing secret is unusable.
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// Encoding a token failed.
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    // Password errors
    /// Hashing a password failed (bad parameters or primitive failure).
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
}

impl AuthError {
    /// Check if this error indicates an expired token.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, AuthError::Expired)
    }

    /// Check if this error indicates an invalid signature.
    #[must_use]
    pub fn is_invalid_signature(&self) -> bool {
        matches!(self, AuthError::InvalidSignature)
    }

    /// Check if the token could not be interpreted at all.
    ///
    /// Wrong algorithm, missing claims and kind confusion all count as
    /// structural problems with the presented token.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            AuthError::Malformed(_)
                | AuthError::InvalidAlgorithm
                | AuthError::MissingClaim(_)
                | AuthError::WrongKind { .. }
        )
    }

    /// Check if this error came from validating a presented token.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        self.is_expired() || self.is_invalid_signature() || self.is_malformed()
    }
}
