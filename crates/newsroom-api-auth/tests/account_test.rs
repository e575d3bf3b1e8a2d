//! Registration, login and identity resolution.

mod common;

use async_trait::async_trait;
use common::*;
use newsroom_api_auth::{
    ApiAuthError, AuthService, AuthSettings, Capability, ExternalIdentity, IdentityResolver,
};
use newsroom_core::{
    DirectoryError, NewPrincipal, Principal, PrincipalPatch, UserDirectory, UserId,
};
use newsroom_session::SessionStore;
use std::sync::Arc;

#[tokio::test]
async fn test_register_then_login_resolves_principal() {
    let fixture = TestFixture::new();
    let ann = fixture.register_ann().await;
    assert!(!ann.verified_author);
    assert!(!ann.is_admin);

    let pair = fixture
        .auth
        .login("ann@x.com", ANN_PASSWORD, "Firefox")
        .await
        .unwrap();
    assert_eq!(pair.token_type, "bearer");
    assert!(pair.access_expires_at < pair.refresh_expires_at);

    let me = fixture.resolver.resolve(&pair.access_token).await.unwrap();
    assert_eq!(me.id, ann.id);
    assert_eq!(me.name, "Ann");
    assert!(me.password_hash.is_none());

    let stored = fixture.directory.find_by_id(ann.id).await.unwrap().unwrap();
    let hash = stored.password_hash.unwrap();
    assert!(hash.starts_with("$argon2id$"));
    assert!(!hash.contains(ANN_PASSWORD));
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let fixture = TestFixture::new();
    fixture.register_ann().await;
    assert!(fixture
        .auth
        .login("  ANN@X.com", ANN_PASSWORD, "Firefox")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let fixture = TestFixture::new();
    fixture.register_ann().await;

    for email in ["ann@x.com", "Ann@X.COM "] {
        let result = fixture.auth.register(account("Other Ann", email)).await;
        assert!(matches!(result, Err(ApiAuthError::DuplicateEmail)), "{email}");
    }
    assert_eq!(fixture.directory.len().await, 1);
}

#[tokio::test]
async fn test_bad_credentials_are_indistinguishable() {
    let fixture = TestFixture::new();
    fixture.register_ann().await;

    let wrong_password = fixture
        .auth
        .login("ann@x.com", "wrong", "Firefox")
        .await
        .unwrap_err();
    let unknown_email = fixture
        .auth
        .login("nobody@x.com", ANN_PASSWORD, "Firefox")
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, ApiAuthError::InvalidCredentials));
    assert!(matches!(unknown_email, ApiAuthError::InvalidCredentials));
    assert_eq!(wrong_password.public_message(), unknown_email.public_message());
    assert_eq!(wrong_password.status_code(), unknown_email.status_code());
}

#[tokio::test]
async fn test_failed_login_opens_no_session() {
    let fixture = TestFixture::new();
    let ann = fixture.register_ann().await;
    let _ = fixture.auth.login("ann@x.com", "wrong", "Firefox").await;
    assert!(fixture.auth.list_sessions(&ann).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_external_login_find_or_create() {
    let fixture = TestFixture::new();
    let identity = ExternalIdentity {
        email: "Gh@X.com".to_string(),
        display_name: None,
        avatar_url: Some("https://avatars.example/gh.png".to_string()),
    };

    let first = fixture
        .auth
        .login_external(identity.clone(), "Firefox")
        .await
        .unwrap();
    let second = fixture.auth.login_external(identity, "Safari").await.unwrap();

    let a = fixture.resolver.resolve(&first.access_token).await.unwrap();
    let b = fixture.resolver.resolve(&second.access_token).await.unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(a.name, "gh@x.com");
    assert_eq!(a.avatar_url.as_deref(), Some("https://avatars.example/gh.png"));
    assert_eq!(fixture.directory.len().await, 1);

    let stored = fixture.directory.find_by_id(a.id).await.unwrap().unwrap();
    assert!(!stored.has_password());
    assert_eq!(fixture.auth.list_sessions(&a).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_external_login_reuses_password_account() {
    let fixture = TestFixture::new();
    let ann = fixture.register_ann().await;

    let pair = fixture
        .auth
        .login_external(
            ExternalIdentity {
                email: "ann@x.com".to_string(),
                display_name: Some("Ann on GitHub".to_string()),
                avatar_url: None,
            },
            "Firefox",
        )
        .await
        .unwrap();

    let me = fixture.resolver.resolve(&pair.access_token).await.unwrap();
    assert_eq!(me.id, ann.id);
    assert_eq!(me.name, "Ann");
}

#[tokio::test]
async fn test_role_checks_follow_directory_after_invalidate() {
    let fixture = TestFixture::new();
    let ann = fixture.register_ann().await;
    let pair = fixture
        .auth
        .login("ann@x.com", ANN_PASSWORD, "Firefox")
        .await
        .unwrap();

    let me = fixture.resolver.resolve(&pair.access_token).await.unwrap();
    assert!(matches!(
        IdentityResolver::require_role(&me, Capability::VerifiedAuthor),
        Err(ApiAuthError::Forbidden(_))
    ));

    fixture
        .directory
        .update(
            ann.id,
            PrincipalPatch {
                verified_author: Some(true),
                ..PrincipalPatch::default()
            },
        )
        .await
        .unwrap();
    fixture.resolver.invalidate(ann.id).await.unwrap();

    let me = fixture.resolver.resolve(&pair.access_token).await.unwrap();
    let author = IdentityResolver::require_role(&me, Capability::VerifiedAuthor).unwrap();
    assert_eq!(author.id, ann.id);
    assert!(author.verified_author);
    assert!(IdentityResolver::require_role(&me, Capability::Admin).is_err());
}

#[tokio::test]
async fn test_forged_access_token_is_unauthenticated() {
    let fixture = TestFixture::new();
    let ann = fixture.register_ann().await;
    let forger = newsroom_auth::TokenCodec::new(b"someone-elses-signing-secret").unwrap();
    let forged = forger
        .mint_access(ann.id, chrono::Duration::minutes(5))
        .unwrap();

    assert!(matches!(
        fixture.resolver.resolve(&forged.token).await,
        Err(ApiAuthError::Unauthenticated)
    ));
}

/// Directory that is always down.
struct DownDirectory;

#[async_trait]
impl UserDirectory for DownDirectory {
    async fn find_by_id(&self, _id: UserId) -> Result<Option<Principal>, DirectoryError> {
        Err(DirectoryError::Unavailable("connection refused".to_string()))
    }
    async fn find_by_email(&self, _email: &str) -> Result<Option<Principal>, DirectoryError> {
        Err(DirectoryError::Unavailable("connection refused".to_string()))
    }
    async fn create(&self, _new: NewPrincipal) -> Result<Principal, DirectoryError> {
        Err(DirectoryError::Unavailable("connection refused".to_string()))
    }
    async fn update(
        &self,
        _id: UserId,
        _patch: PrincipalPatch,
    ) -> Result<Option<Principal>, DirectoryError> {
        Err(DirectoryError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_directory_outage_is_service_unavailable() {
    let auth = AuthService::new(
        Arc::new(DownDirectory),
        SessionStore::in_memory(),
        newsroom_auth::TokenCodec::new(TEST_SECRET).unwrap(),
        test_vault(),
        AuthSettings::default(),
    );

    let err = auth
        .login("ann@x.com", ANN_PASSWORD, "Firefox")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiAuthError::Directory(_)));
    assert_eq!(err.status_code(), http::StatusCode::SERVICE_UNAVAILABLE);
}
