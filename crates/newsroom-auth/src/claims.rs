//! Token claims.
//!
//! Claims are deliberately minimal: the subject, the token kind, the issue and
//! expiry instants, and a `jti` on refresh tokens. Authorization attributes
//! (admin, verified author) are not embedded; they are resolved from the
//! directory so a demotion takes effect without waiting for tokens to expire.

use crate::error::AuthError;
use chrono::{DateTime, Duration, TimeZone, Utc};
use newsroom_core::{SessionId, UserId};
use serde::{Deserialize, Serialize};

/// Which credential a token represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived, stateless, not individually revocable.
    Access,
    /// Long-lived, valid only while its session exists.
    Refresh,
}

impl TokenKind {
    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by every newsroom token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the principal id.
    pub sub: String,

    /// Token kind.
    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Issued at, Unix seconds.
    pub iat: i64,

    /// Expiration, Unix seconds.
    pub exp: i64,

    /// Refresh token identity. Absent on access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl TokenClaims {
    /// Claims for an access token expiring `ttl` from now.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidTtl` if `now + ttl` is outside the representable range.
    pub fn access(subject: UserId, ttl: Duration) -> Result<Self, AuthError> {
        Self::issue(subject, TokenKind::Access, ttl, None)
    }

    /// Claims for a refresh token expiring `ttl` from now.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidTtl` if `now + ttl` is outside the representable range.
    pub fn refresh(subject: UserId, jti: SessionId, ttl: Duration) -> Result<Self, AuthError> {
        Self::issue(subject, TokenKind::Refresh, ttl, Some(jti))
    }

    fn issue(
        subject: UserId,
        kind: TokenKind,
        ttl: Duration,
        jti: Option<SessionId>,
    ) -> Result<Self, AuthError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::InvalidTtl(format!("{}s", ttl.num_seconds())))?;
        Ok(Self {
            sub: subject.to_string(),
            kind,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: jti.map(|id| id.to_string()),
        })
    }

    /// Parse the subject claim.
    ///
    /// # Errors
    ///
    /// `AuthError::MissingClaim("sub")` if empty or not a principal id.
    pub fn subject(&self) -> Result<UserId, AuthError> {
        if self.sub.is_empty() {
            return Err(AuthError::MissingClaim("sub".to_string()));
        }
        self.sub
            .parse()
            .map_err(|_| AuthError::MissingClaim("sub".to_string()))
    }

    /// Parse the `jti` claim.
    ///
    /// # Errors
    ///
    /// `AuthError::MissingClaim("jti")` if absent or unparsable.
    pub fn session_id(&self) -> Result<SessionId, AuthError> {
        self.jti
            .as_deref()
            .and_then(|jti| jti.parse().ok())
            .ok_or_else(|| AuthError::MissingClaim("jti".to_string()))
    }

    /// Expiry as an absolute instant.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether `exp` is in the past, ignoring leeway.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Check the kind matches.
    ///
    /// # Errors
    ///
    /// `AuthError::WrongKind` on mismatch.
    pub fn expect_kind(&self, expected: TokenKind) -> Result<(), AuthError> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(AuthError::WrongKind {
                expected: expected.as_str(),
                actual: self.kind.as_str(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_claims_have_no_jti() {
        let claims = TokenClaims::access(UserId::new(), Duration::minutes(30)).unwrap();
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.jti.is_none());
        assert!(claims.exp > claims.iat);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_refresh_claims_carry_jti() {
        let jti = SessionId::new();
        let claims = TokenClaims::refresh(UserId::new(), jti, Duration::days(7)).unwrap();
        assert_eq!(claims.session_id().unwrap(), jti);
        assert_eq!(claims.exp - claims.iat, Duration::days(7).num_seconds());
    }

    #[test]
    fn test_subject_round_trip() {
        let user = UserId::new();
        let claims = TokenClaims::access(user, Duration::minutes(1)).unwrap();
        assert_eq!(claims.subject().unwrap(), user);
    }

    #[test]
    fn test_bad_subject_is_missing_claim() {
        let mut claims = TokenClaims::access(UserId::new(), Duration::minutes(1)).unwrap();
        claims.sub = "42".to_string();
        assert!(matches!(claims.subject(), Err(AuthError::MissingClaim(c)) if c == "sub"));

        claims.sub = String::new();
        assert!(matches!(claims.subject(), Err(AuthError::MissingClaim(_))));
    }

    #[test]
    fn test_expect_kind() {
        let claims = TokenClaims::access(UserId::new(), Duration::minutes(1)).unwrap();
        assert!(claims.expect_kind(TokenKind::Access).is_ok());
        assert!(matches!(
            claims.expect_kind(TokenKind::Refresh),
            Err(AuthError::WrongKind { expected: "refresh", actual: "access" })
        ));
    }

    #[test]
    fn test_kind_serializes_under_type() {
        let claims = TokenClaims::access(UserId::new(), Duration::minutes(1)).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "access");
        assert!(json.get("jti").is_none());
    }

    #[test]
    fn test_unrepresentable_expiry_is_an_error() {
        let huge = Duration::days(100_000_000);
        assert!(matches!(
            TokenClaims::access(UserId::new(), huge),
            Err(AuthError::InvalidTtl(_))
        ));
        assert!(matches!(
            TokenClaims::refresh(UserId::new(), SessionId::new(), huge),
            Err(AuthError::InvalidTtl(_))
        ));
    }
}
