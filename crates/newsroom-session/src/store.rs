//! The session store handle.

use newsroom_core::{SessionId, UserId};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{BackendKind, MemoryBackend, RedisBackend, SessionBackend};
use crate::health::{HealthTracker, StoreHealth};
use crate::{InfrastructureDegraded, Session, StoreError};

/// Default bound on the networked connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Connection settings for [`SessionStore::connect`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL. `None` selects the in-process backend.
    pub url: Option<String>,
    /// Bound on the connect attempt (including the verifying `PING`).
    pub connect_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// Config for a networked store at `url`.
    #[must_use]
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Override the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Session registry and general TTL cache.
///
/// The backend is chosen once by [`SessionStore::connect`] and never switched
/// afterwards; callers cannot observe which one is serving except through
/// [`SessionStore::health`]. Cloning is cheap and shares the backend.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    health: Arc<HealthTracker>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("backend", &self.backend.kind())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Select and initialize a backend.
    ///
    /// With a URL, connects to Redis within `connect_timeout` and verifies the
    /// connection. Any failure selects the in-process backend and is recorded
    /// as a degradation. Never fails.
    pub async fn connect(config: &StoreConfig) -> Self {
        let Some(url) = config.url.as_deref() else {
            return Self::fallback(InfrastructureDegraded {
                operation: "connect",
                detail: "no networked session store configured".to_string(),
            });
        };

        match RedisBackend::connect(url, config.connect_timeout).await {
            Ok(backend) => {
                tracing::info!(
                    backend = "redis",
                    url = %redact_url(url),
                    "Connected to session store"
                );
                Self::from_backend(Arc::new(backend), None)
            }
            Err(e) => Self::fallback(InfrastructureDegraded {
                operation: "connect",
                detail: e.to_string(),
            }),
        }
    }

    /// A store backed only by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(
            Arc::new(MemoryBackend::new()),
            Some(InfrastructureDegraded {
                operation: "connect",
                detail: "no networked session store configured".to_string(),
            }),
        )
    }

    /// Wrap an existing backend. `fallback` marks it as a degraded stand-in.
    #[must_use]
    pub fn from_backend(
        backend: Arc<dyn SessionBackend>,
        fallback: Option<InfrastructureDegraded>,
    ) -> Self {
        let kind = backend.kind();
        Self {
            backend,
            health: Arc::new(HealthTracker::new(kind, fallback)),
        }
    }

    fn fallback(reason: InfrastructureDegraded) -> Self {
        tracing::warn!(
            condition = "infrastructure_degraded",
            operation = reason.operation,
            backend = "memory",
            error = %reason.detail,
            "Session store using in-process fallback; sessions are not shared across instances"
        );
        Self::from_backend(Arc::new(MemoryBackend::new()), Some(reason))
    }

    /// Backend currently serving.
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> StoreHealth {
        self.health.snapshot()
    }

    /// Most recent degradation, if any.
    #[must_use]
    pub fn last_degradation(&self) -> Option<InfrastructureDegraded> {
        self.health.last_degradation()
    }

    /// Ping the backend and return the resulting health.
    pub async fn probe(&self) -> StoreHealth {
        let result = self.backend.ping().await;
        let _ = self.observe("probe", result);
        self.health()
    }

    /// Shutdown hook.
    pub async fn close(&self) {
        tracing::info!(
            backend = %self.backend.kind(),
            "Closing session store"
        );
    }

    /// Record a degraded interaction observed by a caller.
    pub fn record_degradation(&self, operation: &'static str, err: &StoreError) {
        tracing::warn!(
            condition = "infrastructure_degraded",
            operation,
            backend = %self.backend.kind(),
            error = %err,
            "Session store operation failed"
        );
        self.health.record_failure(InfrastructureDegraded {
            operation,
            detail: err.to_string(),
        });
    }

    fn observe<T>(
        &self,
        operation: &'static str,
        result: Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        match &result {
            Ok(_) => self.health.record_success(),
            Err(e) => self.record_degradation(operation, e),
        }
        result
    }

    /// Record a session for `ttl`.
    pub async fn put(&self, session: &Session, ttl: Duration) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Err(StoreError::InvalidTtl);
        }
        let result = self.backend.put(session, ttl).await;
        self.observe("put", result)
    }

    /// Fetch a live session.
    pub async fn get(&self, jti: SessionId) -> Result<Option<Session>, StoreError> {
        let result = self.backend.get(jti).await;
        self.observe("get", result)
    }

    /// Atomically remove and return a live session.
    pub async fn take(&self, jti: SessionId) -> Result<Option<Session>, StoreError> {
        let result = self.backend.take(jti).await;
        self.observe("take", result)
    }

    /// Remove a session. Idempotent.
    pub async fn delete(&self, jti: SessionId) -> Result<bool, StoreError> {
        let result = self.backend.delete(jti).await;
        self.observe("delete", result)
    }

    /// Ids of the owner's live sessions.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<SessionId>, StoreError> {
        let result = self.backend.list_for_user(user_id).await;
        self.observe("list_for_user", result)
    }

    /// Remove every session of the owner.
    pub async fn delete_all_for_user(&self, user_id: UserId) -> Result<usize, StoreError> {
        let result = self.backend.delete_all_for_user(user_id).await;
        self.observe("delete_all_for_user", result)
    }

    /// General cache read.
    pub async fn cache_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self.backend.cache_get(key).await;
        self.observe("cache_get", result)
    }

    /// General cache write.
    pub async fn cache_set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Err(StoreError::InvalidTtl);
        }
        let result = self.backend.cache_set(key, value, ttl).await;
        self.observe("cache_set", result)
    }

    /// Remove a cache entry.
    pub async fn cache_delete(&self, key: &str) -> Result<(), StoreError> {
        let result = self.backend.cache_delete(key).await;
        self.observe("cache_delete", result)
    }
}

/// Hide the password component of a connection URL.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((userinfo, host)) => match userinfo.split_once(':') {
            Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
            None => format!("{scheme}://***@{host}"),
        },
        None => url.to_string(),
    }
}
