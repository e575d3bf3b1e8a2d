//! Session registry for newsroom.
//!
//! This crate provides:
//! - A TTL session registry keyed by refresh-token identity with per-user
//!   membership sets ([`SessionStore`])
//! - A general TTL key/value cache on the same backend
//! - A networked Redis backend and an in-process fallback, selected once at
//!   connect time
//! - Health reporting that surfaces degradation instead of hiding it
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration as ChronoDuration, Utc};
//! use newsroom_core::{SessionId, UserId};
//! use newsroom_session::{Session, SessionStore};
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = SessionStore::in_memory();
//! let session = Session {
//!     jti: SessionId::new(),
//!     user_id: UserId::new(),
//!     user_agent: "curl/8.0".to_string(),
//!     expires_at: Utc::now() + ChronoDuration::days(7),
//! };
//!
//! store.put(&session, Duration::from_secs(3600)).await.unwrap();
//! assert_eq!(store.take(session.jti).await.unwrap(), Some(session.clone()));
//! assert_eq!(store.take(session.jti).await.unwrap(), None);
//! # });
//! ```

pub mod backend;
mod error;
mod health;
mod session;
mod store;

pub use backend::{BackendKind, MemoryBackend, RedisBackend, SessionBackend};
pub use error::{InfrastructureDegraded, StoreError};
pub use health::{StoreHealth, StoreHealthState};
pub use session::Session;
pub use store::{SessionStore, StoreConfig, DEFAULT_CONNECT_TIMEOUT};
