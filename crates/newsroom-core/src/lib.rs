//! newsroom Core Library
//!
//! Shared types for the newsroom credential and session services.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (UserId, SessionId)
//! - [`principal`] - The principal model and its patchable fields
//! - [`directory`] - The user directory seam and an in-memory implementation
//!
//! # Example
//!
//! ```
//! use newsroom_core::{InMemoryUserDirectory, NewPrincipal, UserDirectory};
//!
//! # tokio_test_block(async {
//! let directory = InMemoryUserDirectory::new();
//! let ann = directory
//!     .create(NewPrincipal {
//!         name: "Ann".into(),
//!         email: "ann@x.com".into(),
//!         verified_author: false,
//!         avatar_url: None,
//!         is_admin: false,
//!         password_hash: None,
//!     })
//!     .await
//!     .unwrap();
//! assert!(!ann.has_password());
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

pub mod directory;
pub mod ids;
pub mod principal;

pub use directory::{DirectoryError, InMemoryUserDirectory, UserDirectory};
pub use ids::{ParseIdError, SessionId, UserId};
pub use principal::{NewPrincipal, Principal, PrincipalPatch};
