//! Token and password primitives for newsroom.
//!
//! This crate provides:
//! - HS256 signed access and refresh tokens with mandatory signature and
//!   expiry checks ([`TokenCodec`])
//! - Argon2id password hashing ([`PasswordVault`])
//!
//! # Example
//!
//! ```rust
//! use chrono::Duration;
//! use newsroom_auth::{PasswordVault, TokenCodec};
//! use newsroom_core::UserId;
//!
//! let codec = TokenCodec::new(b"an-example-signing-secret").unwrap();
//! let user = UserId::new();
//!
//! let refresh = codec.mint_refresh(user, Duration::days(7)).unwrap();
//! let claims = codec.decode_refresh(&refresh.token).unwrap();
//! assert_eq!(claims.session_id().unwrap(), refresh.jti);
//!
//! let vault = PasswordVault::with_params(4096, 1, 1).unwrap();
//! let hash = vault.hash("pw123").unwrap();
//! assert!(vault.verify("pw123", &hash));
//! ```

mod claims;
mod error;
mod jwt;
mod password;

pub use claims::{TokenClaims, TokenKind};
pub use error::AuthError;
pub use jwt::{
    MintedRefresh, MintedToken, TokenCodec, DEFAULT_LEEWAY_SECS, MAX_LEEWAY_SECS,
    MIN_SECRET_BYTES,
};
pub use password::{
    PasswordVault, DEFAULT_ITERATIONS, DEFAULT_MEMORY_KIB, DEFAULT_PARALLELISM,
};
