//! Storage backends for the session registry.
//!
//! Two implementations:
//! - [`RedisBackend`] - networked, shared across instances
//! - [`MemoryBackend`] - process-local fallback

mod memory;
mod redis_backend;

pub use self::memory::MemoryBackend;
pub use self::redis_backend::RedisBackend;

use async_trait::async_trait;
use newsroom_core::{SessionId, UserId};
use serde::Serialize;
use std::time::Duration;

use crate::{Session, StoreError};

/// Which backend is serving the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Shared Redis instance.
    Redis,
    /// Process-local maps.
    Memory,
}

impl BackendKind {
    /// Stable name for logs and health output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Redis => "redis",
            BackendKind::Memory => "memory",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations every session backend provides.
///
/// All reads must treat records past their TTL as absent. `take` must be
/// atomic: among concurrent callers for the same id, at most one receives
/// the session.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Backend identity.
    fn kind(&self) -> BackendKind;

    /// Store a session for `ttl` and add its id to the owner's set.
    async fn put(&self, session: &Session, ttl: Duration) -> Result<(), StoreError>;

    /// Fetch a live session.
    async fn get(&self, jti: SessionId) -> Result<Option<Session>, StoreError>;

    /// Atomically remove and return a live session.
    async fn take(&self, jti: SessionId) -> Result<Option<Session>, StoreError>;

    /// Remove a session. Returns whether a live record was removed.
    async fn delete(&self, jti: SessionId) -> Result<bool, StoreError>;

    /// Ids of the owner's live sessions, pruning stale memberships.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<SessionId>, StoreError>;

    /// Remove every session of the owner. Returns the number removed.
    async fn delete_all_for_user(&self, user_id: UserId) -> Result<usize, StoreError>;

    /// General key/value cache read.
    async fn cache_get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// General key/value cache write with a per-entry TTL.
    async fn cache_set(&self, key: &str, value: String, ttl: Duration)
        -> Result<(), StoreError>;

    /// Remove a cache entry.
    async fn cache_delete(&self, key: &str) -> Result<(), StoreError>;

    /// Liveness check.
    async fn ping(&self) -> Result<(), StoreError>;
}
