//! Bearer token to principal resolution.
//!
//! Principals are cached in the session store's general cache under
//! `user:{id}` with a bounded TTL. Each cached copy carries the time it was
//! cached and is ignored once older than the TTL, whatever the backend does.
//! Cache failures never fail a request; they are recorded as degradation by
//! the store and the directory is consulted instead.

use chrono::{DateTime, Utc};
use newsroom_auth::TokenCodec;
use newsroom_core::{Principal, UserDirectory, UserId};
use newsroom_session::SessionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiAuthError;

/// Default and maximum principal cache TTL.
pub const MAX_PRINCIPAL_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Capabilities gated by principal flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Administrative operations.
    Admin,
    /// Publishing as a verified author. Admins also qualify.
    VerifiedAuthor,
}

impl Capability {
    /// Stable name for logs and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Admin => "admin",
            Capability::VerifiedAuthor => "verified_author",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedPrincipal {
    principal: Principal,
    cached_at: DateTime<Utc>,
}

fn cache_key(user_id: UserId) -> String {
    format!("user:{user_id}")
}

/// Resolves bearer access tokens to principals.
#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn UserDirectory>,
    store: SessionStore,
    codec: TokenCodec,
    cache_ttl: Duration,
}

impl IdentityResolver {
    /// Create a resolver with the maximum cache TTL.
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>, store: SessionStore, codec: TokenCodec) -> Self {
        Self {
            directory,
            store,
            codec,
            cache_ttl: MAX_PRINCIPAL_CACHE_TTL,
        }
    }

    /// Set the principal cache TTL, capped at [`MAX_PRINCIPAL_CACHE_TTL`].
    ///
    /// A zero TTL disables caching.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl.min(MAX_PRINCIPAL_CACHE_TTL);
        self
    }

    /// Effective cache TTL.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Resolve an `Authorization` header value of the form `Bearer <token>`.
    pub async fn resolve_header(&self, header: &str) -> Result<Principal, ApiAuthError> {
        let (scheme, token) = header
            .trim()
            .split_once(' ')
            .ok_or(ApiAuthError::Unauthenticated)?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(ApiAuthError::Unauthenticated);
        }
        self.resolve(token.trim()).await
    }

    /// Resolve a bearer access token to its principal.
    ///
    /// The returned principal never carries a password hash.
    ///
    /// # Errors
    ///
    /// - `ApiAuthError::Unauthenticated` for any invalid, expired or non-access
    ///   token, or a subject that no longer exists
    /// - `ApiAuthError::Directory` if the directory cannot be reached
    pub async fn resolve(&self, token: &str) -> Result<Principal, ApiAuthError> {
        let claims = self.codec.decode_access(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            ApiAuthError::Unauthenticated
        })?;
        let user_id = claims.subject().map_err(|_| ApiAuthError::Unauthenticated)?;

        if let Some(principal) = self.cached(user_id).await {
            return Ok(principal);
        }

        let Some(principal) = self.directory.find_by_id(user_id).await? else {
            tracing::debug!(user_id = %user_id, "Bearer token for unknown principal");
            return Err(ApiAuthError::Unauthenticated);
        };

        let principal = principal.without_credentials();
        self.populate(&principal).await;
        Ok(principal)
    }

    /// Check a capability, handing the principal back on success.
    ///
    /// # Errors
    ///
    /// `ApiAuthError::Forbidden` if the principal lacks it.
    pub fn require_role(
        principal: &Principal,
        capability: Capability,
    ) -> Result<&Principal, ApiAuthError> {
        let allowed = match capability {
            Capability::Admin => principal.is_admin,
            Capability::VerifiedAuthor => principal.verified_author || principal.is_admin,
        };

        if allowed {
            Ok(principal)
        } else {
            tracing::debug!(
                user_id = %principal.id,
                capability = capability.as_str(),
                "Capability check failed"
            );
            Err(ApiAuthError::Forbidden(format!(
                "{} capability required",
                capability.as_str()
            )))
        }
    }

    /// Drop the cached copy of a principal, typically after a directory update.
    pub async fn invalidate(&self, user_id: UserId) -> Result<(), ApiAuthError> {
        self.store.cache_delete(&cache_key(user_id)).await?;
        tracing::debug!(user_id = %user_id, "Principal cache entry invalidated");
        Ok(())
    }

    async fn cached(&self, user_id: UserId) -> Option<Principal> {
        if self.cache_ttl.is_zero() {
            return None;
        }

        let key = cache_key(user_id);
        let raw = self.store.cache_get(&key).await.ok()??;

        let entry: CachedPrincipal = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Discarding unreadable principal cache entry");
                let _ = self.store.cache_delete(&key).await;
                return None;
            }
        };

        let age = (Utc::now() - entry.cached_at).to_std().unwrap_or(Duration::ZERO);
        if age >= self.cache_ttl || entry.principal.id != user_id {
            return None;
        }
        Some(entry.principal)
    }

    async fn populate(&self, principal: &Principal) {
        if self.cache_ttl.is_zero() {
            return;
        }

        let entry = CachedPrincipal {
            principal: principal.without_credentials(),
            cached_at: Utc::now(),
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(user_id = %principal.id, error = %e, "Failed to encode principal for cache");
                return;
            }
        };

        // Failures are already recorded by the store.
        let _ = self
            .store
            .cache_set(&cache_key(principal.id), payload, self.cache_ttl)
            .await;
    }
}
