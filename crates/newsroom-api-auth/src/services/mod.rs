//! Business logic services for authentication.

pub mod auth_service;
pub mod identity_resolver;
pub mod validation;

pub use auth_service::{
    AuthService, AuthSettings, ExternalIdentity, NewAccount, SessionSummary, TokenPair,
    DEFAULT_ACCESS_TOKEN_MINUTES, DEFAULT_REFRESH_TOKEN_DAYS,
};
pub use identity_resolver::{Capability, IdentityResolver, MAX_PRINCIPAL_CACHE_TTL};
pub use validation::{normalize_email, validate_email, EmailValidationError};
