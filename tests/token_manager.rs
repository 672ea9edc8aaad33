mod common;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{MockTransport, TOKEN_PATH, json_response, token_response};
use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde_json::json;
use spotifyrs::{
    AuthorizationCodeSource, Credentials, Error, HttpRequest, RequestBody, Scope, SpotifyClient,
    Token, TokenManager,
};
use std::sync::{Arc, Mutex};
use url::Url;

fn manager(transport: &Arc<MockTransport>) -> TokenManager {
    TokenManager::new(Credentials::new("client_id", "client_secret"), transport.clone())
}

fn form_field(request: &HttpRequest, key: &str) -> Option<String> {
    match &request.body {
        Some(RequestBody::Form(fields)) => fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone()),
        _ => None,
    }
}

fn expired_token(refresh_token: Option<&str>) -> Token {
    Token::new(
        "expired-token",
        Some(Utc::now() - Duration::minutes(5)),
        refresh_token.map(str::to_string),
    )
}

#[tokio::test]
async fn test_first_call_uses_client_credentials() {
    let transport = Arc::new(MockTransport::new());
    let tokens = manager(&transport);

    let token = tokens.get_token().await.unwrap();

    assert_eq!(token.access_token, "test-token");
    assert!(!token.is_expired());

    let requests = transport.requests_to(TOKEN_PATH);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(
        requests[0].headers.get(AUTHORIZATION).unwrap(),
        "Basic Y2xpZW50X2lkOmNsaWVudF9zZWNyZXQ="
    );
    assert_eq!(
        form_field(&requests[0], "grant_type").as_deref(),
        Some("client_credentials")
    );
}

#[tokio::test]
async fn test_valid_token_is_reused() {
    let transport = Arc::new(MockTransport::new());
    let tokens = manager(&transport);

    let first = tokens.get_token().await.unwrap();
    let second = tokens.get_token().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(transport.count(TOKEN_PATH), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_exchange() {
    let transport = Arc::new(MockTransport::new().with_latency(std::time::Duration::from_millis(200)));
    let tokens = manager(&transport);

    let (first, second, third) = tokio::join!(tokens.get_token(), tokens.get_token(), tokens.get_token());

    let first = first.unwrap();
    assert!(Arc::ptr_eq(&first, &second.unwrap()));
    assert!(Arc::ptr_eq(&first, &third.unwrap()));
    assert_eq!(transport.count(TOKEN_PATH), 1);
}

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
        Method::POST,
        TOKEN_PATH,
        token_response("refreshed-token", 3600, None),
    );
    let tokens = manager(&transport).with_token(expired_token(Some("my-refresh-token")));

    let token = tokens.get_token().await.unwrap();

    assert_eq!(token.access_token, "refreshed-token");
    // The refresh response carried no refresh token, so the old one is kept
    assert_eq!(token.refresh_token.as_deref(), Some("my-refresh-token"));

    let requests = transport.requests_to(TOKEN_PATH);
    assert_eq!(requests.len(), 1);
    assert_eq!(form_field(&requests[0], "grant_type").as_deref(), Some("refresh_token"));
    assert_eq!(
        form_field(&requests[0], "refresh_token").as_deref(),
        Some("my-refresh-token")
    );
}

#[tokio::test]
async fn test_rotated_refresh_token_replaces_old_one() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
        Method::POST,
        TOKEN_PATH,
        token_response("refreshed-token", 3600, Some("rotated-refresh-token")),
    );
    let tokens = manager(&transport).with_token(expired_token(Some("my-refresh-token")));

    let token = tokens.get_token().await.unwrap();

    assert_eq!(token.refresh_token.as_deref(), Some("rotated-refresh-token"));
    assert_eq!(tokens.current_token().unwrap(), token);
}

#[tokio::test]
async fn test_expired_token_without_refresh_token_uses_client_credentials() {
    let transport = Arc::new(MockTransport::new());
    let tokens = manager(&transport).with_token(expired_token(None));

    let token = tokens.get_token().await.unwrap();

    assert_eq!(token.access_token, "test-token");
    let requests = transport.requests_to(TOKEN_PATH);
    assert_eq!(requests.len(), 1);
    assert_eq!(
        form_field(&requests[0], "grant_type").as_deref(),
        Some("client_credentials")
    );
}

#[tokio::test]
async fn test_token_without_expiry_triggers_exchange() {
    let transport = Arc::new(MockTransport::new());
    let tokens = manager(&transport).with_token(Token::new("no-expiry", None, None));

    let token = tokens.get_token().await.unwrap();

    assert_eq!(token.access_token, "test-token");
    assert_eq!(transport.count(TOKEN_PATH), 1);
}

#[tokio::test]
async fn test_unexpired_token_makes_no_call() {
    let transport = Arc::new(MockTransport::new());
    let tokens = manager(&transport).with_token(Token::new(
        "still-valid",
        Some(Utc::now() + Duration::minutes(10)),
        None,
    ));

    let token = tokens.get_token().await.unwrap();

    assert_eq!(token.access_token, "still-valid");
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_rejected_exchange_is_authentication_error() {
    let transport = Arc::new(MockTransport::new());
    transport.on_json(
        Method::POST,
        TOKEN_PATH,
        400,
        json!({ "error": "invalid_client", "error_description": "Invalid client secret" }),
    );
    let tokens = manager(&transport);

    let err = tokens.get_token().await.unwrap_err();

    match err {
        Error::Authentication { status, message } => {
            assert_eq!(status, Some(400));
            assert_eq!(message, "Invalid client secret");
        }
        other => panic!("expected an authentication error, got {other:?}"),
    }
    // Token exchanges are never retried
    assert_eq!(transport.count(TOKEN_PATH), 1);
    assert!(tokens.current_token().is_none());
}

#[tokio::test]
async fn test_malformed_token_response_is_authentication_error() {
    let transport = Arc::new(MockTransport::new());
    transport.on_json(Method::POST, TOKEN_PATH, 200, json!({ "unexpected": true }));
    let tokens = manager(&transport);

    let err = tokens.get_token().await.unwrap_err();

    assert!(matches!(err, Error::Authentication { status: Some(200), .. }));
    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn test_out_of_range_expiry_is_authentication_error() {
    let transport = Arc::new(MockTransport::new());
    transport.on(Method::POST, TOKEN_PATH, token_response("t", i64::MAX, None));
    let tokens = manager(&transport);

    let err = tokens.get_token().await.unwrap_err();

    match err {
        Error::Authentication { status, message } => {
            assert_eq!(status, Some(200));
            assert!(message.contains("invalid expires_in"));
        }
        other => panic!("expected an authentication error, got {other:?}"),
    }
    assert!(tokens.current_token().is_none());
}

#[tokio::test]
async fn test_refresh_callback_receives_new_token() {
    let transport = Arc::new(MockTransport::new());
    let seen: Arc<Mutex<Vec<Token>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    let tokens = manager(&transport).with_refresh_callback(move |token| {
        seen_clone.lock().unwrap().push(token);
    });

    let token = tokens.get_token().await.unwrap();
    tokens.get_token().await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], *token);
}

#[tokio::test]
async fn test_client_token_refresh_callback_fires_on_first_request() {
    let transport = Arc::new(MockTransport::new());
    transport.on_json(Method::GET, "/markets", 200, json!({ "markets": ["US", "SE"] }));

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    let client = SpotifyClient::new("client_id", "client_secret")
        .with_transport(transport.clone())
        .with_token_refresh_callback(move |token| {
            seen_clone.lock().unwrap().push(token.access_token);
        });

    let markets = client.available_markets().await.unwrap();

    assert_eq!(markets, vec!["US", "SE"]);
    assert_eq!(*seen.lock().unwrap(), vec!["test-token".to_string()]);
    assert_eq!(
        transport.requests_to("/markets")[0].headers.get(AUTHORIZATION).unwrap(),
        "Bearer test-token"
    );
}

#[tokio::test]
async fn test_authorization_code_exchange() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
        Method::POST,
        TOKEN_PATH,
        json_response(
            200,
            json!({
                "access_token": "user-token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "user-refresh-token",
                "scope": "user-read-private"
            }),
        ),
    );

    let client = SpotifyClient::new("client_id", "client_secret").with_transport(transport.clone());
    let token = client
        .authorize("the-code", "http://127.0.0.1:8888/callback")
        .await
        .unwrap();

    assert_eq!(token.access_token, "user-token");
    assert_eq!(token.refresh_token.as_deref(), Some("user-refresh-token"));
    assert_eq!(token.scope.as_deref(), Some("user-read-private"));
    assert_eq!(client.get_token().unwrap(), token);

    let request = &transport.requests_to(TOKEN_PATH)[0];
    assert_eq!(
        form_field(request, "grant_type").as_deref(),
        Some("authorization_code")
    );
    assert_eq!(form_field(request, "code").as_deref(), Some("the-code"));
    assert_eq!(
        form_field(request, "redirect_uri").as_deref(),
        Some("http://127.0.0.1:8888/callback")
    );
}

struct FixedCode {
    seen_url: Mutex<Option<Url>>,
}

#[async_trait]
impl AuthorizationCodeSource for FixedCode {
    async fn authorization_code(&self, authorize_url: &Url) -> Result<String, Error> {
        *self.seen_url.lock().unwrap() = Some(authorize_url.clone());
        Ok("code-from-source".to_string())
    }
}

#[tokio::test]
async fn test_authorize_with_code_source() {
    let transport = Arc::new(MockTransport::new());
    let client = SpotifyClient::new("client_id", "client_secret").with_transport(transport.clone());
    let source = FixedCode {
        seen_url: Mutex::new(None),
    };

    client
        .authorize_with(
            &source,
            "http://127.0.0.1:8888/callback",
            &[Scope::UserReadPrivate, Scope::UserLibraryRead],
        )
        .await
        .unwrap();

    let url = source.seen_url.lock().unwrap().clone().unwrap();
    assert_eq!(url.host_str(), Some("accounts.spotify.com"));
    let scope = url
        .query_pairs()
        .find(|(key, _)| key == "scope")
        .map(|(_, value)| value.into_owned());
    assert_eq!(scope.as_deref(), Some("user-read-private user-library-read"));

    let request = &transport.requests_to(TOKEN_PATH)[0];
    assert_eq!(form_field(request, "code").as_deref(), Some("code-from-source"));
}

#[test]
fn test_authorize_url_parameters() {
    let client = SpotifyClient::new("client_id", "client_secret");

    let url = client
        .authorize_url(
            "http://127.0.0.1:8888/callback",
            &[Scope::PlaylistModifyPublic],
            Some("xyz"),
            true,
        )
        .unwrap();

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("client_id".to_string(), "client_id".to_string())));
    assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
    assert!(pairs.contains(&(
        "redirect_uri".to_string(),
        "http://127.0.0.1:8888/callback".to_string()
    )));
    assert!(pairs.contains(&("scope".to_string(), "playlist-modify-public".to_string())));
    assert!(pairs.contains(&("state".to_string(), "xyz".to_string())));
    assert!(pairs.contains(&("show_dialog".to_string(), "true".to_string())));
}
