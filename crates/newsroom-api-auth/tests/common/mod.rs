//! Test helpers for newsroom-api-auth integration tests.
//!
//! Provides a fully wired service fixture over an in-memory directory and a
//! caller-chosen session store.

#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use newsroom_api_auth::{AuthService, AuthSettings, IdentityResolver, NewAccount};
use newsroom_auth::{PasswordVault, TokenCodec};
use newsroom_core::{InMemoryUserDirectory, Principal, SessionId, UserId};
use newsroom_session::{Session, SessionStore, StoreConfig};
use std::sync::Arc;
use std::time::Duration;

/// Signing secret shared by every fixture.
pub const TEST_SECRET: &[u8] = b"integration-test-signing-secret";

/// Test Redis URL environment variable.
pub const TEST_REDIS_URL_ENV: &str = "TEST_REDIS_URL";

/// Password used by [`TestFixture::register_ann`].
pub const ANN_PASSWORD: &str = "pw123";

/// Wired services sharing one directory and store.
pub struct TestFixture {
    pub directory: Arc<InMemoryUserDirectory>,
    pub store: SessionStore,
    pub codec: TokenCodec,
    pub auth: AuthService,
    pub resolver: IdentityResolver,
}

impl TestFixture {
    /// Fixture over the in-process store.
    pub fn new() -> Self {
        Self::with_store(SessionStore::in_memory())
    }

    /// Fixture over a store that was pointed at an unreachable Redis.
    pub async fn with_unreachable_redis() -> Self {
        let config = StoreConfig::redis("redis://127.0.0.1:1")
            .with_connect_timeout(Duration::from_millis(300));
        Self::with_store(SessionStore::connect(&config).await)
    }

    /// Fixture over a live Redis at `TEST_REDIS_URL`.
    pub async fn with_redis() -> Self {
        let url = std::env::var(TEST_REDIS_URL_ENV)
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        Self::with_store(SessionStore::connect(&StoreConfig::redis(url)).await)
    }

    pub fn with_store(store: SessionStore) -> Self {
        let directory = Arc::new(InMemoryUserDirectory::new());
        let codec = TokenCodec::new(TEST_SECRET).expect("valid test secret");
        let auth = AuthService::new(
            directory.clone(),
            store.clone(),
            codec.clone(),
            test_vault(),
            AuthSettings::default(),
        );
        let resolver = IdentityResolver::new(directory.clone(), store.clone(), codec.clone());
        Self {
            directory,
            store,
            codec,
            auth,
            resolver,
        }
    }

    /// Register Ann (ann@x.com / pw123).
    pub async fn register_ann(&self) -> Principal {
        self.auth
            .register(account("Ann", "ann@x.com"))
            .await
            .expect("Failed to register Ann")
    }

    /// Record a session directly in the store.
    pub async fn seed_session(&self, user_id: UserId, user_agent: &str, expires_in: ChronoDuration) -> SessionId {
        let session = Session {
            jti: SessionId::new(),
            user_id,
            user_agent: user_agent.to_string(),
            expires_at: Utc::now() + expires_in,
        };
        let ttl = expires_in.to_std().expect("positive TTL");
        self.store.put(&session, ttl).await.expect("Failed to seed session");
        session.jti
    }
}

/// Registration input with the shared test password.
pub fn account(name: &str, email: &str) -> NewAccount {
    NewAccount {
        name: name.to_string(),
        email: email.to_string(),
        password: ANN_PASSWORD.to_string(),
        verified_author: false,
        avatar_url: None,
    }
}

/// A cheap work factor so tests stay fast.
pub fn test_vault() -> PasswordVault {
    PasswordVault::with_params(4096, 1, 1).expect("valid test params")
}
