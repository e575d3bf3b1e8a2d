//! Redis session backend.
//!
//! Key layout:
//! - `session:{jti}` - JSON session record with `EX` set to the session TTL
//! - `user_sessions:{user_id}` - set of jti strings, expiring a day after the
//!   most recent write
//! - plain keys for the general cache (for example `user:{id}`)

use async_trait::async_trait;
use newsroom_core::{SessionId, UserId};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use super::{BackendKind, SessionBackend};
use crate::session::{
    session_key, user_sessions_key, SESSION_KEY_PREFIX, USER_SESSIONS_KEY_PREFIX,
};
use crate::{Session, StoreError};

/// Extra lifetime of a membership set beyond its newest session.
const MEMBERSHIP_GRACE_SECS: u64 = 86_400;

/// KEYS[1] = session key, ARGV[1] = membership key prefix, ARGV[2] = jti.
/// Returns the consumed record, or nil.
const TAKE_SCRIPT: &str = r"
local raw = redis.call('GET', KEYS[1])
if not raw then
    return false
end
redis.call('DEL', KEYS[1])
local ok, record = pcall(cjson.decode, raw)
if ok and type(record) == 'table' and type(record.user_id) == 'string' then
    redis.call('SREM', ARGV[1] .. record.user_id, ARGV[2])
end
return raw
";

/// KEYS[1] = membership key, ARGV[1] = session key prefix.
const DELETE_ALL_SCRIPT: &str = r"
local set_key = KEYS[1]
local ids = redis.call('SMEMBERS', set_key)
local removed = 0
for _, id in ipairs(ids) do
    if redis.call('DEL', ARGV[1] .. id) == 1 then
        removed = removed + 1
    end
end
redis.call('DEL', set_key)
return removed
";

/// Networked backend over a multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend").finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Open a connection and verify it with `PING`.
    ///
    /// The whole attempt is bounded by `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;

        let attempt = async {
            let mut conn = ConnectionManager::new(client).await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(conn)
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(conn)) => Ok(Self { conn }),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Unavailable(format!(
                "connect timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    fn decode(raw: Option<String>) -> Result<Option<Session>, StoreError> {
        raw.map(|json| serde_json::from_str::<Session>(&json))
            .transpose()
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl SessionBackend for RedisBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    async fn put(&self, session: &Session, ttl: Duration) -> Result<(), StoreError> {
        let ttl_secs = ttl.as_secs().max(1);
        let members_ttl = ttl_secs
            .checked_add(MEMBERSHIP_GRACE_SECS)
            .and_then(|secs| i64::try_from(secs).ok())
            .ok_or(StoreError::InvalidTtl)?;
        let payload = serde_json::to_string(session)?;
        let members_key = user_sessions_key(&session.user_id);
        let mut conn = self.conn.clone();

        let _: () = redis::pipe()
            .atomic()
            .set_ex(session_key(&session.jti), payload, ttl_secs)
            .ignore()
            .sadd(&members_key, session.jti.to_string())
            .ignore()
            .expire(&members_key, members_ttl)
            .ignore()
            .query_async(&mut conn)
            .await?;

        tracing::debug!(
            jti = %session.jti,
            user_id = %session.user_id,
            ttl_seconds = ttl_secs,
            "Stored session"
        );
        Ok(())
    }

    async fn get(&self, jti: SessionId) -> Result<Option<Session>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(session_key(&jti)).await?;
        Self::decode(raw)
    }

    async fn take(&self, jti: SessionId) -> Result<Option<Session>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::Script::new(TAKE_SCRIPT)
            .key(session_key(&jti))
            .arg(USER_SESSIONS_KEY_PREFIX)
            .arg(jti.to_string())
            .invoke_async(&mut conn)
            .await?;
        Self::decode(raw)
    }

    async fn delete(&self, jti: SessionId) -> Result<bool, StoreError> {
        Ok(self.take(jti).await?.is_some())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<SessionId>, StoreError> {
        let members_key = user_sessions_key(&user_id);
        let mut conn = self.conn.clone();

        let members: Vec<String> = conn.smembers(&members_key).await?;
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates = Vec::with_capacity(members.len());
        let mut stale = Vec::new();
        for member in members {
            match member.parse::<SessionId>() {
                Ok(jti) => candidates.push((jti, member)),
                Err(_) => stale.push(member),
            }
        }

        let mut live = Vec::with_capacity(candidates.len());
        if !candidates.is_empty() {
            let mut pipe = redis::pipe();
            for (jti, _) in &candidates {
                pipe.exists(session_key(jti));
            }
            let present: Vec<bool> = pipe.query_async(&mut conn).await?;
            for ((jti, member), exists) in candidates.into_iter().zip(present) {
                if exists {
                    live.push(jti);
                } else {
                    stale.push(member);
                }
            }
        }

        if !stale.is_empty() {
            let pruned = stale.len();
            let _: () = conn.srem(&members_key, stale).await?;
            tracing::debug!(user_id = %user_id, pruned, "Pruned stale session memberships");
        }

        Ok(live)
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        let removed: usize = redis::Script::new(DELETE_ALL_SCRIPT)
            .key(user_sessions_key(&user_id))
            .arg(SESSION_KEY_PREFIX)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed)
    }

    async fn cache_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn cache_set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn cache_delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
