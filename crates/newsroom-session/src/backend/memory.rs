//! In-process session backend.
//!
//! Used when no networked store is configured or the networked store could
//! not be reached at startup. State is local to this process and lost on
//! restart.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use newsroom_core::{SessionId, UserId};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{BackendKind, SessionBackend};
use crate::{Session, StoreError};

/// Upper bound on general cache entries.
const MAX_CACHE_ENTRIES: u64 = 10_000;

/// Puts between full sweeps of expired sessions.
const SWEEP_EVERY: usize = 256;

#[derive(Debug, Clone)]
struct StoredSession {
    session: Session,
    deadline: Instant,
}

impl StoredSession {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline > now
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    sessions: HashMap<SessionId, StoredSession>,
    by_user: HashMap<UserId, HashSet<SessionId>>,
    puts_since_sweep: usize,
}

impl MemoryState {
    fn unlink(&mut self, user_id: UserId, jti: SessionId) {
        if let Some(members) = self.by_user.get_mut(&user_id) {
            members.remove(&jti);
            if members.is_empty() {
                self.by_user.remove(&user_id);
            }
        }
    }

    /// Remove the record and its membership; returns it only if live.
    fn remove(&mut self, jti: SessionId, now: Instant) -> Option<Session> {
        let stored = self.sessions.remove(&jti)?;
        self.unlink(stored.session.user_id, jti);
        stored.is_live(now).then_some(stored.session)
    }

    fn sweep(&mut self, now: Instant) {
        let expired: Vec<(SessionId, UserId)> = self
            .sessions
            .iter()
            .filter(|(_, stored)| !stored.is_live(now))
            .map(|(jti, stored)| (*jti, stored.session.user_id))
            .collect();

        for (jti, user_id) in expired {
            self.sessions.remove(&jti);
            self.unlink(user_id, jti);
        }
        self.puts_since_sweep = 0;
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-local sessions with lazy expiry, plus a bounded TTL cache.
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    cache: Cache<String, CacheEntry>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("cache_entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            cache: Cache::builder()
                .max_capacity(MAX_CACHE_ENTRIES)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Number of session records held, live or not yet swept.
    pub async fn stored_sessions(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Drop every expired session record now.
    pub async fn purge_expired(&self) {
        self.state.lock().await.sweep(Instant::now());
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn put(&self, session: &Session, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let deadline = now.checked_add(ttl).ok_or(StoreError::InvalidTtl)?;
        let mut state = self.state.lock().await;

        state.puts_since_sweep += 1;
        if state.puts_since_sweep >= SWEEP_EVERY {
            state.sweep(now);
        }

        state
            .by_user
            .entry(session.user_id)
            .or_default()
            .insert(session.jti);
        state.sessions.insert(
            session.jti,
            StoredSession {
                session: session.clone(),
                deadline,
            },
        );
        Ok(())
    }

    async fn get(&self, jti: SessionId) -> Result<Option<Session>, StoreError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;

        let live = state
            .sessions
            .get(&jti)
            .map(|stored| stored.is_live(now).then(|| stored.session.clone()));

        match live {
            Some(Some(session)) => Ok(Some(session)),
            Some(None) => {
                state.remove(jti, now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn take(&self, jti: SessionId) -> Result<Option<Session>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.remove(jti, Instant::now()))
    }

    async fn delete(&self, jti: SessionId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.remove(jti, Instant::now()).is_some())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<SessionId>, StoreError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;

        let Some(members) = state.by_user.get(&user_id).cloned() else {
            return Ok(Vec::new());
        };

        let mut live = Vec::with_capacity(members.len());
        for jti in members {
            match state.sessions.get(&jti).map(|stored| stored.is_live(now)) {
                Some(true) => live.push(jti),
                Some(false) => {
                    state.remove(jti, now);
                }
                None => state.unlink(user_id, jti),
            }
        }
        Ok(live)
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<usize, StoreError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;

        let Some(members) = state.by_user.remove(&user_id) else {
            return Ok(0);
        };

        let removed = members
            .into_iter()
            .filter_map(|jti| state.sessions.remove(&jti))
            .filter(|stored| stored.is_live(now))
            .count();
        Ok(removed)
    }

    async fn cache_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn cache_set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.cache
            .insert(key.to_string(), CacheEntry { value, ttl })
            .await;
        Ok(())
    }

    async fn cache_delete(&self, key: &str) -> Result<(), StoreError> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
