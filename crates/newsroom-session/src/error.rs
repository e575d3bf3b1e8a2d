//! Error types for session store operations.

use thiserror::Error;

/// Session store failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The networked backend could not be reached or rejected the command.
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("Session store serialization error: {0}")]
    Serialization(String),

    /// The TTL is zero or too large to place a deadline.
    #[error("Session TTL must be positive and representable")]
    InvalidTtl,
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// A recorded loss of infrastructure capability.
///
/// This is not a call failure: the store keeps serving (from the fallback, or
/// by letting callers skip optional cache work) and reports the condition
/// through [`crate::StoreHealth`].
#[derive(Debug, Clone, Error)]
#[error("Infrastructure degraded during {operation}: {detail}")]
pub struct InfrastructureDegraded {
    /// The operation that observed the degradation.
    pub operation: &'static str,
    /// Backend error text.
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            StoreError::Unavailable("connection refused".to_string()).to_string(),
            "Session store unavailable: connection refused"
        );
        let degraded = InfrastructureDegraded {
            operation: "connect",
            detail: "timed out".to_string(),
        };
        assert_eq!(
            degraded.to_string(),
            "Infrastructure degraded during connect: timed out"
        );
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Serialization(_)));
    }
}
