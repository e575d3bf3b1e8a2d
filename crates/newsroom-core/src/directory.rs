//! User directory seam.
//!
//! The directory is the external collaborator that owns principal records.
//! Production deployments back it with the content service's database; the
//! in-memory implementation here serves tests and standalone runs.

use crate::ids::UserId;
use crate::principal::{NewPrincipal, Principal, PrincipalPatch};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors surfaced by a user directory.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// Another principal already owns this email.
    #[error("Email already registered")]
    EmailConflict,

    /// The backing store could not be reached or failed the operation.
    #[error("User directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup and mutation interface over principal records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a principal by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<Principal>, DirectoryError>;

    /// Find a principal by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, DirectoryError>;

    /// Create a principal. Fails with `EmailConflict` if the email is taken.
    async fn create(&self, fields: NewPrincipal) -> Result<Principal, DirectoryError>;

    /// Apply a patch. Returns `None` if the principal does not exist.
    async fn update(
        &self,
        id: UserId,
        patch: PrincipalPatch,
    ) -> Result<Option<Principal>, DirectoryError>;
}

/// Process-local directory keyed by id with an email index.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserDirectory {
    inner: Arc<RwLock<DirectoryState>>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    by_id: HashMap<UserId, Principal>,
    by_email: HashMap<String, UserId>,
}

impl InMemoryUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored principals.
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }

    /// Whether the directory holds no principals.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_id.is_empty()
    }

    /// Remove a principal, returning whether it existed.
    pub async fn remove(&self, id: UserId) -> bool {
        let mut state = self.inner.write().await;
        match state.by_id.remove(&id) {
            Some(principal) => {
                state.by_email.remove(&principal.email);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Principal>, DirectoryError> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, DirectoryError> {
        let state = self.inner.read().await;
        Ok(state
            .by_email
            .get(email)
            .and_then(|id| state.by_id.get(id))
            .cloned())
    }

    async fn create(&self, fields: NewPrincipal) -> Result<Principal, DirectoryError> {
        let mut state = self.inner.write().await;
        if state.by_email.contains_key(&fields.email) {
            return Err(DirectoryError::EmailConflict);
        }

        let principal = Principal {
            id: UserId::new(),
            name: fields.name,
            email: fields.email,
            verified_author: fields.verified_author,
            avatar_url: fields.avatar_url,
            is_admin: fields.is_admin,
            registered_at: Utc::now(),
            password_hash: fields.password_hash,
        };

        state.by_email.insert(principal.email.clone(), principal.id);
        state.by_id.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn update(
        &self,
        id: UserId,
        patch: PrincipalPatch,
    ) -> Result<Option<Principal>, DirectoryError> {
        let mut state = self.inner.write().await;
        Ok(state.by_id.get_mut(&id).map(|principal| {
            patch.apply(principal);
            principal.clone()
        }))
    }
}
