//! Account and token lifecycle services for newsroom.
//!
//! This crate provides the operations a routing layer exposes:
//! - Registration and password login ([`AuthService::register`], [`AuthService::login`])
//! - External-identity login ([`AuthService::login_external`])
//! - Refresh-token rotation ([`AuthService::refresh`]) and logout
//! - Session listing and revocation
//! - Bearer token resolution and capability checks ([`IdentityResolver`])
//!
//! # Example
//!
//! ```rust
//! use newsroom_api_auth::{AuthService, AuthSettings, IdentityResolver, NewAccount};
//! use newsroom_auth::{PasswordVault, TokenCodec};
//! use newsroom_core::InMemoryUserDirectory;
//! use newsroom_session::SessionStore;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let directory = Arc::new(InMemoryUserDirectory::new());
//! let store = SessionStore::in_memory();
//! let codec = TokenCodec::new(b"an-example-signing-secret").unwrap();
//! let auth = AuthService::new(
//!     directory.clone(),
//!     store.clone(),
//!     codec.clone(),
//!     PasswordVault::with_params(4096, 1, 1).unwrap(),
//!     AuthSettings::default(),
//! );
//! let resolver = IdentityResolver::new(directory, store, codec);
//!
//! auth.register(NewAccount {
//!     name: "Ann".into(),
//!     email: "ann@x.com".into(),
//!     password: "pw123".into(),
//!     verified_author: false,
//!     avatar_url: None,
//! })
//! .await
//! .unwrap();
//!
//! let pair = auth.login("ann@x.com", "pw123", "curl/8.0").await.unwrap();
//! let me = resolver.resolve(&pair.access_token).await.unwrap();
//! assert_eq!(me.email, "ann@x.com");
//! # });
//! ```

pub mod error;
pub mod services;

pub use error::{ApiAuthError, ProblemDetails};
pub use services::{
    AuthService, AuthSettings, Capability, ExternalIdentity, IdentityResolver, NewAccount,
    SessionSummary, TokenPair,
};
