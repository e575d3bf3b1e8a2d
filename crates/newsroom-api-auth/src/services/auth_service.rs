//! Authentication service for account and token lifecycle operations.
//!
//! Handles registration, password and external-identity login, refresh-token
//! rotation, logout and session management.

use chrono::{DateTime, Duration, Utc};
use newsroom_auth::{PasswordVault, TokenCodec};
use newsroom_core::{NewPrincipal, Principal, SessionId, UserDirectory};
use newsroom_session::{Session, SessionStore};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiAuthError;
use crate::services::validation::{
    normalize_email, validate_email, validate_name, validate_password,
};

/// Default access token lifetime in minutes.
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;

/// Default refresh token lifetime in days.
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;

/// Stored user agents are cut to this many characters.
const MAX_USER_AGENT_LENGTH: usize = 512;

/// Token lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    /// Access token lifetime.
    pub access_ttl: Duration,
    /// Refresh token (and session) lifetime.
    pub refresh_ttl: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_MINUTES),
            refresh_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_DAYS),
        }
    }
}

/// Registration input.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub verified_author: bool,
    pub avatar_url: Option<String>,
}

/// Identity asserted by an external provider after its own verification.
#[derive(Debug, Clone)]
pub struct ExternalIdentity {
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Access and refresh token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// A live session as shown to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub user_agent: String,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionSummary {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.jti,
            user_agent: session.user_agent,
            expires_at: session.expires_at,
        }
    }
}

/// Service for account and token lifecycle operations.
#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    store: SessionStore,
    codec: TokenCodec,
    vault: PasswordVault,
    settings: AuthSettings,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: SessionStore,
        codec: TokenCodec,
        vault: PasswordVault,
        settings: AuthSettings,
    ) -> Self {
        Self {
            directory,
            store,
            codec,
            vault,
            settings,
        }
    }

    /// Configured token lifetimes.
    #[must_use]
    pub fn settings(&self) -> AuthSettings {
        self.settings
    }

    /// Register a new password account.
    ///
    /// # Errors
    ///
    /// - `ApiAuthError::InvalidInput` if the name, email or password is unusable
    /// - `ApiAuthError::DuplicateEmail` if the email is already registered
    pub async fn register(&self, account: NewAccount) -> Result<Principal, ApiAuthError> {
        let name = validate_name(&account.name).map_err(ApiAuthError::InvalidInput)?;
        let email = normalize_email(&account.email);
        validate_email(&email).map_err(|e| ApiAuthError::InvalidInput(e.to_string()))?;
        validate_password(&account.password).map_err(ApiAuthError::InvalidInput)?;

        if self.directory.find_by_email(&email).await?.is_some() {
            tracing::debug!(email = %email, "Registration attempt for existing email");
            return Err(ApiAuthError::DuplicateEmail);
        }

        let password_hash = self.hash_password(account.password).await?;

        // A concurrent registration can still win the race; the directory's
        // conflict maps to DuplicateEmail.
        let principal = self
            .directory
            .create(NewPrincipal {
                name,
                email,
                verified_author: account.verified_author,
                avatar_url: account.avatar_url,
                is_admin: false,
                password_hash: Some(password_hash),
            })
            .await?;

        tracing::info!(user_id = %principal.id, "User registered successfully");
        Ok(principal.without_credentials())
    }

    /// Authenticate with email and password and open a session.
    ///
    /// # Errors
    ///
    /// `ApiAuthError::InvalidCredentials` if the email is unknown, the account
    /// has no password, or the password does not verify.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        user_agent: &str,
    ) -> Result<TokenPair, ApiAuthError> {
        let email = normalize_email(email);

        let Some(user) = self.directory.find_by_email(&email).await? else {
            tracing::debug!(email = %email, "Login attempt for non-existent user");
            return Err(ApiAuthError::InvalidCredentials);
        };

        let Some(hash) = user.password_hash.clone() else {
            tracing::debug!(user_id = %user.id, "Password login attempt for external-only account");
            return Err(ApiAuthError::InvalidCredentials);
        };

        if !self.verify_password(password.to_string(), hash).await? {
            tracing::debug!(user_id = %user.id, "Invalid password attempt");
            return Err(ApiAuthError::InvalidCredentials);
        }

        let pair = self.issue_pair(&user, user_agent).await?;
        tracing::info!(user_id = %user.id, "User logged in successfully");
        Ok(pair)
    }

    /// Sign in with an identity already verified by an external provider.
    ///
    /// Creates a password-less account on first sight of the email.
    ///
    /// # Errors
    ///
    /// `ApiAuthError::InvalidInput` if the provider supplied no usable email.
    pub async fn login_external(
        &self,
        identity: ExternalIdentity,
        user_agent: &str,
    ) -> Result<TokenPair, ApiAuthError> {
        let email = normalize_email(&identity.email);
        if email.is_empty() {
            return Err(ApiAuthError::InvalidInput(
                "Email not provided by identity provider".to_string(),
            ));
        }
        validate_email(&email).map_err(|e| ApiAuthError::InvalidInput(e.to_string()))?;

        let user = match self.directory.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                let name = identity
                    .display_name
                    .as_deref()
                    .and_then(|n| validate_name(n).ok())
                    .unwrap_or_else(|| email.clone());

                let created = self
                    .directory
                    .create(NewPrincipal {
                        name,
                        email: email.clone(),
                        verified_author: false,
                        avatar_url: identity.avatar_url,
                        is_admin: false,
                        password_hash: None,
                    })
                    .await;

                match created {
                    Ok(user) => {
                        tracing::info!(user_id = %user.id, "External account created");
                        user
                    }
                    // Lost a race with a concurrent first login for the same email.
                    Err(newsroom_core::DirectoryError::EmailConflict) => self
                        .directory
                        .find_by_email(&email)
                        .await?
                        .ok_or_else(|| {
                            ApiAuthError::Internal("external account vanished".to_string())
                        })?,
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let pair = self.issue_pair(&user, user_agent).await?;
        tracing::info!(user_id = %user.id, "User logged in with external identity");
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair, consuming its session.
    ///
    /// The session is removed atomically before anything is minted, so among
    /// concurrent calls with the same token at most one succeeds.
    ///
    /// # Errors
    ///
    /// - `ApiAuthError::Expired` / `InvalidSignature` / `Malformed` on decode failure
    /// - `ApiAuthError::SessionNotFound` if the session was already used or revoked
    /// - `ApiAuthError::Unauthenticated` if the account no longer exists
    pub async fn refresh(
        &self,
        refresh_token: &str,
        user_agent: &str,
    ) -> Result<TokenPair, ApiAuthError> {
        let claims = self.codec.decode_refresh(refresh_token)?;
        let user_id = claims.subject()?;
        let jti = claims.session_id()?;

        let Some(session) = self.store.take(jti).await? else {
            tracing::warn!(user_id = %user_id, jti = %jti, "Refresh with unknown or consumed session");
            return Err(ApiAuthError::SessionNotFound);
        };

        if !session.is_owned_by(user_id) {
            tracing::warn!(
                user_id = %user_id,
                owner = %session.user_id,
                jti = %jti,
                "Refresh token subject does not own its session"
            );
            return Err(ApiAuthError::SessionNotFound);
        }

        let Some(user) = self.directory.find_by_id(user_id).await? else {
            tracing::debug!(user_id = %user_id, "Refresh for deleted account");
            return Err(ApiAuthError::Unauthenticated);
        };

        let pair = self.issue_pair(&user, user_agent).await?;
        tracing::info!(user_id = %user.id, rotated_jti = %jti, "Refresh token rotated");
        Ok(pair)
    }

    /// Revoke the session behind a refresh token. Idempotent.
    ///
    /// Expired tokens are accepted so their sessions can still be removed;
    /// the signature is always checked.
    ///
    /// # Errors
    ///
    /// `ApiAuthError::InvalidSignature` / `Malformed` if the token is not ours.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ApiAuthError> {
        let claims = self.codec.decode_for_revocation(refresh_token)?;
        let user_id = claims.subject()?;
        let jti = claims.session_id()?;

        let removed = self.store.delete(jti).await?;
        tracing::info!(user_id = %user_id, jti = %jti, removed, "User logged out");
        Ok(())
    }

    /// The principal's live sessions, newest expiry first.
    pub async fn list_sessions(
        &self,
        principal: &Principal,
    ) -> Result<Vec<SessionSummary>, ApiAuthError> {
        let ids = self.store.list_for_user(principal.id).await?;

        let mut sessions = Vec::with_capacity(ids.len());
        for jti in ids {
            // Expired or revoked between the listing and this read.
            if let Some(session) = self.store.get(jti).await? {
                sessions.push(SessionSummary::from(session));
            }
        }

        sessions.sort_by(|a, b| b.expires_at.cmp(&a.expires_at));
        Ok(sessions)
    }

    /// Revoke one of the principal's sessions.
    ///
    /// # Errors
    ///
    /// `ApiAuthError::SessionNotFound` if no such session belongs to the principal.
    pub async fn revoke_session(
        &self,
        principal: &Principal,
        session_id: SessionId,
    ) -> Result<(), ApiAuthError> {
        match self.store.get(session_id).await? {
            Some(session) if session.is_owned_by(principal.id) => {
                self.store.delete(session_id).await?;
                tracing::info!(user_id = %principal.id, jti = %session_id, "Session revoked");
                Ok(())
            }
            _ => Err(ApiAuthError::SessionNotFound),
        }
    }

    /// Revoke every session of the principal. Returns how many were removed.
    pub async fn revoke_all_sessions(&self, principal: &Principal) -> Result<usize, ApiAuthError> {
        let removed = self.store.delete_all_for_user(principal.id).await?;
        tracing::info!(user_id = %principal.id, removed, "All sessions revoked");
        Ok(removed)
    }

    async fn issue_pair(
        &self,
        user: &Principal,
        user_agent: &str,
    ) -> Result<TokenPair, ApiAuthError> {
        let access = self.codec.mint_access(user.id, self.settings.access_ttl)?;
        let refresh = self.codec.mint_refresh(user.id, self.settings.refresh_ttl)?;

        let ttl = self
            .settings
            .refresh_ttl
            .to_std()
            .map_err(|e| ApiAuthError::Internal(format!("invalid refresh TTL: {e}")))?;

        let session = Session {
            jti: refresh.jti,
            user_id: user.id,
            user_agent: user_agent.chars().take(MAX_USER_AGENT_LENGTH).collect(),
            expires_at: refresh.expires_at,
        };
        self.store.put(&session, ttl).await?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "bearer",
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
        })
    }

    async fn hash_password(&self, password: String) -> Result<String, ApiAuthError> {
        let vault = self.vault.clone();
        let hash = tokio::task::spawn_blocking(move || vault.hash(&password))
            .await
            .map_err(|e| ApiAuthError::Internal(format!("password hashing task failed: {e}")))??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, ApiAuthError> {
        let vault = self.vault.clone();
        tokio::task::spawn_blocking(move || vault.verify(&password, &hash))
            .await
            .map_err(|e| ApiAuthError::Internal(format!("password verification task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsroom_core::InMemoryUserDirectory;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(InMemoryUserDirectory::new()),
            SessionStore::in_memory(),
            TokenCodec::new(b"unit-test-signing-secret").unwrap(),
            PasswordVault::with_params(4096, 1, 1).unwrap(),
            AuthSettings::default(),
        )
    }

    fn account(email: &str) -> NewAccount {
        NewAccount {
            name: "Ann".to_string(),
            email: email.to_string(),
            password: "pw123".to_string(),
            verified_author: false,
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_and_strips_hash() {
        let service = service();
        let principal = service.register(account("  Ann@X.com ")).await.unwrap();
        assert_eq!(principal.email, "ann@x.com");
        assert!(principal.password_hash.is_none());
        assert!(!principal.is_admin);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let service = service();
        assert!(matches!(
            service.register(account("not-an-email")).await,
            Err(ApiAuthError::InvalidInput(_))
        ));

        let mut nameless = account("ann@x.com");
        nameless.name = "  ".to_string();
        assert!(matches!(
            service.register(nameless).await,
            Err(ApiAuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_login_external_only_account_with_password_fails() {
        let service = service();
        service
            .login_external(
                ExternalIdentity {
                    email: "gh@x.com".to_string(),
                    display_name: None,
                    avatar_url: None,
                },
                "Firefox",
            )
            .await
            .unwrap();

        assert!(matches!(
            service.login("gh@x.com", "anything", "Firefox").await,
            Err(ApiAuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_external_requires_email() {
        let service = service();
        let result = service
            .login_external(
                ExternalIdentity {
                    email: "  ".to_string(),
                    display_name: Some("Ghost".to_string()),
                    avatar_url: None,
                },
                "Firefox",
            )
            .await;
        assert!(matches!(result, Err(ApiAuthError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_user_agent_is_truncated() {
        let service = service();
        let principal = service.register(account("ann@x.com")).await.unwrap();
        let long_agent = "x".repeat(MAX_USER_AGENT_LENGTH * 2);
        service.login("ann@x.com", "pw123", &long_agent).await.unwrap();

        let sessions = service.list_sessions(&principal).await.unwrap();
        assert_eq!(sessions[0].user_agent.len(), MAX_USER_AGENT_LENGTH);
    }

    #[tokio::test]
    async fn test_logout_rejects_access_token() {
        let service = service();
        service.register(account("ann@x.com")).await.unwrap();
        let pair = service.login("ann@x.com", "pw123", "Firefox").await.unwrap();

        assert!(matches!(
            service.logout(&pair.access_token).await,
            Err(ApiAuthError::Malformed(_))
        ));
    }
}
