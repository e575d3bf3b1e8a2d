//! Error types for the newsroom auth services.
//!
//! Uses RFC 7807 Problem Details for structured error responses. Outward
//! messages for authentication failures are deliberately undifferentiated.

use http::StatusCode;
use newsroom_auth::AuthError;
use newsroom_core::DirectoryError;
use newsroom_session::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ERROR_BASE_URL: &str = "https://newsroom.dev/errors/auth";

/// RFC 7807 Problem Details body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// URI identifying the problem type.
    #[serde(rename = "type")]
    pub error_type: String,

    /// Short summary of the problem type.
    pub title: String,

    /// HTTP status code.
    pub status: u16,

    /// Explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProblemDetails {
    /// Create a problem of `error_type` with the given title and status.
    #[must_use]
    pub fn new(error_type: &str, title: &str, status: StatusCode) -> Self {
        Self {
            error_type: format!("{ERROR_BASE_URL}/{error_type}"),
            title: title.to_string(),
            status: status.as_u16(),
            detail: None,
        }
    }

    /// Attach a detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Failures of the auth services.
#[derive(Debug, Error)]
pub enum ApiAuthError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("User directory error: {0}")]
    Directory(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for ApiAuthError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Expired => ApiAuthError::Expired,
            AuthError::InvalidSignature => ApiAuthError::InvalidSignature,
            AuthError::Malformed(msg) => ApiAuthError::Malformed(msg),
            AuthError::InvalidAlgorithm
            | AuthError::MissingClaim(_)
            | AuthError::WrongKind { .. } => ApiAuthError::Malformed(err.to_string()),
            AuthError::InvalidKey(msg)
            | AuthError::InvalidTtl(msg)
            | AuthError::EncodingFailed(msg)
            | AuthError::HashingFailed(msg) => ApiAuthError::Internal(msg),
        }
    }
}

impl From<DirectoryError> for ApiAuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::EmailConflict => ApiAuthError::DuplicateEmail,
            DirectoryError::Unavailable(msg) => ApiAuthError::Directory(msg),
        }
    }
}

impl ApiAuthError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiAuthError::DuplicateEmail => StatusCode::CONFLICT,
            ApiAuthError::InvalidCredentials
            | ApiAuthError::Expired
            | ApiAuthError::InvalidSignature
            | ApiAuthError::Malformed(_)
            | ApiAuthError::SessionNotFound
            | ApiAuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiAuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiAuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiAuthError::Store(_) | ApiAuthError::Directory(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiAuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this is a token decode failure.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            ApiAuthError::Expired | ApiAuthError::InvalidSignature | ApiAuthError::Malformed(_)
        )
    }

    /// Message safe to show a client.
    ///
    /// Token and session failures collapse to one message so a caller cannot
    /// tell a forged token from an expired or rotated one.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            ApiAuthError::InvalidCredentials => "Invalid credentials".to_string(),
            ApiAuthError::Expired
            | ApiAuthError::InvalidSignature
            | ApiAuthError::Malformed(_)
            | ApiAuthError::SessionNotFound
            | ApiAuthError::Unauthenticated => "Not authenticated".to_string(),
            ApiAuthError::DuplicateEmail => "Email already registered".to_string(),
            ApiAuthError::Forbidden(_) => "Forbidden".to_string(),
            ApiAuthError::InvalidInput(msg) => msg.clone(),
            ApiAuthError::Store(_) | ApiAuthError::Directory(_) => {
                "Service temporarily unavailable".to_string()
            }
            ApiAuthError::Internal(_) => "Internal server error".to_string(),
        }
    }

    fn problem_type(&self) -> (&'static str, &'static str) {
        match self {
            ApiAuthError::DuplicateEmail => ("duplicate-email", "Email Already Registered"),
            ApiAuthError::InvalidCredentials => ("invalid-credentials", "Invalid Credentials"),
            ApiAuthError::Expired
            | ApiAuthError::InvalidSignature
            | ApiAuthError::Malformed(_)
            | ApiAuthError::SessionNotFound
            | ApiAuthError::Unauthenticated => ("unauthenticated", "Not Authenticated"),
            ApiAuthError::Forbidden(_) => ("forbidden", "Forbidden"),
            ApiAuthError::InvalidInput(_) => ("invalid-input", "Invalid Input"),
            ApiAuthError::Store(_) | ApiAuthError::Directory(_) => {
                ("service-unavailable", "Service Unavailable")
            }
            ApiAuthError::Internal(_) => ("internal-error", "Internal Server Error"),
        }
    }

    /// Problem Details body for this error.
    #[must_use]
    pub fn problem(&self) -> ProblemDetails {
        let (error_type, title) = self.problem_type();
        ProblemDetails::new(error_type, title, self.status_code()).with_detail(self.public_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_details_serialization() {
        let problem = ProblemDetails::new("test-error", "Test Error", StatusCode::BAD_REQUEST)
            .with_detail("This is a test error");

        let json = serde_json::to_string(&problem).unwrap();
        assert!(json.contains("\"type\":\"https://newsroom.dev/errors/auth/test-error\""));
        assert!(json.contains("\"title\":\"Test Error\""));
        assert!(json.contains("\"status\":400"));
        assert!(json.contains("\"detail\":\"This is a test error\""));
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ApiAuthError::DuplicateEmail.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiAuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiAuthError::SessionNotFound.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiAuthError::Forbidden("admin".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiAuthError::InvalidInput("email".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiAuthError::Store(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_public_messages_do_not_leak_cause() {
        let errors = [
            ApiAuthError::Expired,
            ApiAuthError::InvalidSignature,
            ApiAuthError::Malformed("bad base64".into()),
            ApiAuthError::SessionNotFound,
            ApiAuthError::Unauthenticated,
        ];
        for err in errors {
            assert_eq!(err.public_message(), "Not authenticated");
            assert!(!err.problem().detail.unwrap().contains("base64"));
        }
        assert_eq!(
            ApiAuthError::Store(StoreError::Unavailable("10.0.0.3:6379".into())).public_message(),
            "Service temporarily unavailable"
        );
    }

    #[test]
    fn test_from_auth_error() {
        assert!(matches!(ApiAuthError::from(AuthError::Expired), ApiAuthError::Expired));
        assert!(matches!(
            ApiAuthError::from(AuthError::InvalidSignature),
            ApiAuthError::InvalidSignature
        ));
        assert!(matches!(
            ApiAuthError::from(AuthError::MissingClaim("jti".into())),
            ApiAuthError::Malformed(_)
        ));
        assert!(matches!(
            ApiAuthError::from(AuthError::HashingFailed("oom".into())),
            ApiAuthError::Internal(_)
        ));
        assert!(matches!(
            ApiAuthError::from(AuthError::InvalidTtl("huge".into())),
            ApiAuthError::Internal(_)
        ));
    }

    #[test]
    fn test_from_directory_error() {
        assert!(matches!(
            ApiAuthError::from(DirectoryError::EmailConflict),
            ApiAuthError::DuplicateEmail
        ));
        assert!(matches!(
            ApiAuthError::from(DirectoryError::Unavailable("timeout".into())),
            ApiAuthError::Directory(_)
        ));
    }
}
