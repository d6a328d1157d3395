use moodtune::auth::{
    AuthError, RefreshError, SessionEvent, SessionManager, SessionState, SpotifyTokenClient,
    TokenEndpoint,
};
use moodtune::config::ClientOptions;
use moodtune::scheduler::{SystemClock, TokioScheduler};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASIC_AUTH: &str = "Basic bXktY2xpZW50Om15LXNlY3JldA==";

fn token_client(server: &MockServer) -> SpotifyTokenClient {
    let options = ClientOptions::new("my-client", "my-secret")
        .with_redirect_uri("http://localhost:3000/")
        .with_accounts_url(&server.uri());
    SpotifyTokenClient::new(&options, Client::new())
}

#[tokio::test]
async fn test_exchange_code() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc123"))
        .and(body_string_contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2F"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test_access_token",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "test_refresh_token",
            "scope": "streaming user-read-email"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let grant = token_client(&mock_server).exchange_code("abc123").await.unwrap();

    assert_eq!(grant.access_token, "test_access_token");
    assert_eq!(grant.refresh_token.as_deref(), Some("test_refresh_token"));
    assert_eq!(grant.expires_in, 3600);
}

#[tokio::test]
async fn test_exchange_code_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid authorization code"
        })))
        .mount(&mock_server)
        .await;

    let result = token_client(&mock_server).exchange_code("bad").await;

    match result {
        Err(AuthError::Exchange(err)) => {
            assert_eq!(err.status().map(|s| s.as_u16()), Some(400));
        }
        other => panic!("unexpected result: {:?}", other.map(|g| g.access_token)),
    }
}

#[tokio::test]
async fn test_refresh_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=test_refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new_access_token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let refreshed = token_client(&mock_server)
        .refresh_token("test_refresh_token")
        .await
        .unwrap();

    assert_eq!(refreshed.access_token, "new_access_token");
    assert!(refreshed.refresh_token.is_none());
}

#[tokio::test]
async fn test_session_sign_in_and_failed_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test_access_token",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "test_refresh_token"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&mock_server)
        .await;

    let scheduler = Arc::new(TokioScheduler::new());
    let session = SessionManager::new(
        Arc::new(token_client(&mock_server)),
        scheduler.clone(),
        Arc::new(SystemClock),
        Duration::from_secs(60),
    );
    let mut events = session.subscribe();

    session.exchange("abc123").await.unwrap();
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.current_token().as_deref(), Some("test_access_token"));
    assert_eq!(scheduler.live_timers(), 1);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedIn);

    let result = session.refresh().await;
    assert!(matches!(result, Err(RefreshError::Refresh(_))));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.session().is_none());
    assert!(session.current_token().is_none());
    assert_eq!(scheduler.live_timers(), 0);
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::ReauthenticationRequired
    );
}

#[tokio::test]
async fn test_exchange_with_out_of_range_expiry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test_access_token",
            "token_type": "Bearer",
            "expires_in": 20_000_000_000_000_i64,
            "refresh_token": "test_refresh_token"
        })))
        .mount(&mock_server)
        .await;

    let scheduler = Arc::new(TokioScheduler::new());
    let session = SessionManager::new(
        Arc::new(token_client(&mock_server)),
        scheduler.clone(),
        Arc::new(SystemClock),
        Duration::from_secs(60),
    );

    let result = session.exchange("abc123").await;

    assert!(matches!(result, Err(AuthError::Rejected(_))));
    assert_eq!(session.state(), SessionState::Unauthenticated);
    assert!(session.current_token().is_none());
    assert_eq!(scheduler.live_timers(), 0);
}

#[tokio::test]
async fn test_refresh_with_out_of_range_expiry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test_access_token",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "test_refresh_token"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new_access_token",
            "token_type": "Bearer",
            "expires_in": 9_000_000_000_000_000_i64
        })))
        .mount(&mock_server)
        .await;

    let scheduler = Arc::new(TokioScheduler::new());
    let session = SessionManager::new(
        Arc::new(token_client(&mock_server)),
        scheduler.clone(),
        Arc::new(SystemClock),
        Duration::from_secs(60),
    );
    session.exchange("abc123").await.unwrap();

    let result = session.refresh().await;

    assert!(matches!(result, Err(RefreshError::Rejected(_))));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.session().is_none());
    assert_eq!(scheduler.live_timers(), 0);
}
