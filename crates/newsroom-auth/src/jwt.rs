//! Signed token encoding and decoding with HS256.
//!
//! Every token is signed with the process-wide secret. Decoding always checks
//! the signature; expiry is checked on every path except
//! [`TokenCodec::decode_for_revocation`].

use crate::claims::{TokenClaims, TokenKind};
use crate::error::AuthError;
use chrono::{DateTime, Duration};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use newsroom_core::{SessionId, UserId};
use std::sync::Arc;

/// Default clock-skew tolerance for `exp`, in seconds.
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

/// Upper bound accepted for the clock-skew tolerance, in seconds.
pub const MAX_LEEWAY_SECS: u64 = 60;

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_BYTES: usize = 16;

/// A freshly minted access token.
#[derive(Debug, Clone)]
pub struct MintedToken {
    pub token: String,
    pub expires_at: DateTime<chrono::Utc>,
}

/// A freshly minted refresh token and its identity.
#[derive(Debug, Clone)]
pub struct MintedRefresh {
    pub token: String,
    pub jti: SessionId,
    pub expires_at: DateTime<chrono::Utc>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Encodes and decodes newsroom tokens.
///
/// Cloning shares the key material.
#[derive(Clone)]
pub struct TokenCodec {
    keys: Arc<Keys>,
    leeway: u64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &"HS256")
            .field("secret", &"[REDACTED]")
            .field("leeway", &self.leeway)
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec over a symmetric signing secret.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidKey` if the secret is shorter than
    /// [`MIN_SECRET_BYTES`].
    pub fn new(secret: &[u8]) -> Result<Self, AuthError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(AuthError::InvalidKey(format!(
                "signing secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        Ok(Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
            }),
            leeway: DEFAULT_LEEWAY_SECS,
        })
    }

    /// Set the clock-skew tolerance, capped at [`MAX_LEEWAY_SECS`].
    #[must_use]
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway = leeway_secs.min(MAX_LEEWAY_SECS);
        self
    }

    /// Configured clock-skew tolerance in seconds.
    #[must_use]
    pub fn leeway(&self) -> u64 {
        self.leeway
    }

    /// Mint an access token for `subject` expiring `ttl` from now.
    pub fn mint_access(&self, subject: UserId, ttl: Duration) -> Result<MintedToken, AuthError> {
        let claims = TokenClaims::access(subject, ttl)?;
        let token = self.encode(&claims)?;
        Ok(MintedToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// Mint a refresh token with a fresh random `jti`.
    pub fn mint_refresh(
        &self,
        subject: UserId,
        ttl: Duration,
    ) -> Result<MintedRefresh, AuthError> {
        let jti = SessionId::new();
        let claims = TokenClaims::refresh(subject, jti, ttl)?;
        let token = self.encode(&claims)?;
        Ok(MintedRefresh {
            token,
            jti,
            expires_at: claims.expires_at(),
        })
    }

    fn encode(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys.encoding)
            .map_err(|e| AuthError::EncodingFailed(e.to_string()))
    }

    /// Decode a token, verifying signature and expiry.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidSignature` - signature mismatch
    /// - `AuthError::Expired` - past `exp` plus leeway
    /// - `AuthError::Malformed` / `InvalidAlgorithm` / `MissingClaim` - not a
    ///   well-formed newsroom token
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.decode_with(token, true)
    }

    /// Decode an access token.
    pub fn decode_access(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.decode(token)?;
        claims.expect_kind(TokenKind::Access)?;
        claims.subject()?;
        Ok(claims)
    }

    /// Decode a refresh token; the `jti` claim is required.
    pub fn decode_refresh(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.decode(token)?;
        Self::check_refresh(&claims)?;
        Ok(claims)
    }

    /// Decode a refresh token for revocation only.
    ///
    /// The signature is still verified, but `exp` is not enforced so an
    /// expired token's session can be revoked. Never use the result to grant
    /// access.
    pub fn decode_for_revocation(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.decode_with(token, false)?;
        Self::check_refresh(&claims)?;
        Ok(claims)
    }

    fn check_refresh(claims: &TokenClaims) -> Result<(), AuthError> {
        claims.expect_kind(TokenKind::Refresh)?;
        claims.subject()?;
        claims.session_id()?;
        Ok(())
    }

    fn decode_with(&self, token: &str, validate_exp: bool) -> Result<TokenClaims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Malformed("empty token".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256];
        validation.leeway = self.leeway;
        validation.validate_exp = validate_exp;
        validation.validate_aud = false;

        decode::<TokenClaims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }
}

/// Map jsonwebtoken errors to `AuthError`.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            AuthError::InvalidAlgorithm
        }
        ErrorKind::InvalidToken => AuthError::Malformed("wrong number of segments".to_string()),
        ErrorKind::Base64(_) => AuthError::Malformed("invalid base64 encoding".to_string()),
        ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            AuthError::Malformed("invalid claims payload".to_string())
        }
        ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
        _ => AuthError::Malformed(format!("token validation failed: {err}")),
    }
}
