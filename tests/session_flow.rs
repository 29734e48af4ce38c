//! End-to-end session scenarios against the in-memory collaborators.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use chrono::Duration;

use chirpy_auth::auth::jwt::{ISSUER, issue_access_token, verify_access_token};
use chirpy_auth::auth::{
    AccessTokenCodec, AuthError, CredentialHasher, MemoryRefreshStore, MemoryUserDirectory,
    PasswordParams, SessionConfig, SessionService, TokenError,
};
use chirpy_auth::clock::{Clock, ManualClock};
use chirpy_auth::core_types::Principal;

const SECRET: &str = "integration-secret";

fn fast_params() -> PasswordParams {
    PasswordParams {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
        output_len: 32,
    }
}

fn service(clock: Arc<ManualClock>) -> SessionService {
    SessionService::new(
        SessionConfig::default(),
        CredentialHasher::new(fast_params()).unwrap(),
        AccessTokenCodec::new(SECRET, ISSUER, Duration::hours(24)),
        Arc::new(MemoryUserDirectory::new()),
        Arc::new(MemoryRefreshStore::new()),
        clock,
    )
}

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

#[tokio::test]
async fn login_then_refresh_then_authenticate() {
    let clock = Arc::new(ManualClock::starting_now());
    let sessions = service(clock.clone());

    let user = sessions
        .register("walt@breakingbad.com", "123456789")
        .await
        .unwrap();
    let login = sessions
        .login("walt@breakingbad.com", "123456789")
        .await
        .unwrap();

    // Access token expires after an hour; refresh still works days later
    clock.advance(Duration::days(3));
    assert_eq!(
        sessions.authenticate(&bearer(&login.access_token)),
        Err(AuthError::Unauthenticated)
    );

    let fresh = sessions
        .refresh(&bearer(&login.refresh_token.token))
        .await
        .unwrap();
    assert_eq!(sessions.authenticate(&bearer(&fresh)), Ok(user.principal));
}

#[tokio::test]
async fn revoke_ends_refresh_but_not_live_access_tokens() {
    let clock = Arc::new(ManualClock::starting_now());
    let sessions = service(clock.clone());

    let user = sessions.register("a@example.com", "pw-123456").await.unwrap();
    let login = sessions.login("a@example.com", "pw-123456").await.unwrap();

    sessions
        .revoke(&bearer(&login.refresh_token.token))
        .await
        .unwrap();

    assert_eq!(
        sessions.refresh(&bearer(&login.refresh_token.token)).await,
        Err(AuthError::Unauthenticated)
    );
    // Access tokens are stateless and live out their TTL
    assert_eq!(
        sessions.authenticate(&bearer(&login.access_token)),
        Ok(user.principal)
    );
}

#[tokio::test]
async fn refresh_token_past_expiry_is_rejected() {
    let clock = Arc::new(ManualClock::starting_now());
    let sessions = service(clock.clone());

    sessions.register("a@example.com", "pw-123456").await.unwrap();
    let login = sessions.login("a@example.com", "pw-123456").await.unwrap();

    clock.set(login.refresh_token.expires_at + Duration::seconds(1));
    assert_eq!(
        sessions.refresh(&bearer(&login.refresh_token.token)).await,
        Err(AuthError::Unauthenticated)
    );
}

#[tokio::test]
async fn each_login_gets_an_independent_refresh_token() {
    let clock = Arc::new(ManualClock::starting_now());
    let sessions = service(clock.clone());

    sessions.register("a@example.com", "pw-123456").await.unwrap();
    let phone = sessions.login("a@example.com", "pw-123456").await.unwrap();
    let laptop = sessions.login("a@example.com", "pw-123456").await.unwrap();
    assert_ne!(phone.refresh_token.token, laptop.refresh_token.token);

    sessions
        .revoke(&bearer(&phone.refresh_token.token))
        .await
        .unwrap();

    assert!(
        sessions
            .refresh(&bearer(&laptop.refresh_token.token))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn token_signed_by_another_secret_is_rejected() {
    let clock = Arc::new(ManualClock::starting_now());
    let sessions = service(clock.clone());

    let foreign = issue_access_token(Principal::new_v4(), "some-other-secret", Duration::hours(1))
        .unwrap();
    assert_eq!(
        sessions.authenticate(&bearer(&foreign)),
        Err(AuthError::Unauthenticated)
    );
}

#[tokio::test]
async fn free_functions_share_the_codec_rules() {
    let principal = Principal::new_v4();
    let token = issue_access_token(principal, SECRET, Duration::minutes(5)).unwrap();

    assert_eq!(verify_access_token(&token, SECRET), Ok(principal));
    assert_eq!(
        verify_access_token(&token, "wrong"),
        Err(TokenError::InvalidSignature)
    );
}

#[tokio::test]
async fn refresh_does_not_rotate_the_refresh_token() {
    let clock = Arc::new(ManualClock::starting_now());
    let sessions = service(clock.clone());

    sessions.register("a@example.com", "pw-123456").await.unwrap();
    let login = sessions.login("a@example.com", "pw-123456").await.unwrap();

    for _ in 0..3 {
        clock.advance(Duration::hours(2));
        assert!(
            sessions
                .refresh(&bearer(&login.refresh_token.token))
                .await
                .is_ok()
        );
    }
    assert!(clock.now() < login.refresh_token.expires_at);
}
