mod common;

use common::{
    MockTransport, Phase, empty_response, error_response, query_param, rate_limited, valid_token,
};
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde_json::{Value, json};
use spotifyrs::{
    Credentials, Error, HttpResponse, Query, RequestPipeline, RetryPolicy, Route, Token,
    TokenManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn pipeline(transport: &Arc<MockTransport>) -> RequestPipeline {
    let tokens = TokenManager::new(Credentials::new("client_id", "client_secret"), transport.clone())
        .with_token(valid_token());
    RequestPipeline::new(tokens, transport.clone())
}

#[tokio::test]
async fn test_success_attaches_bearer_and_query() {
    let transport = Arc::new(MockTransport::new());
    transport.on_json(Method::GET, "/tracks/abc", 200, json!({ "id": "abc" }));

    let mut query = Query::new();
    query.push("market", "SE").push_opt("limit", None::<u32>);

    let value = pipeline(&transport)
        .request(&Route::get("/tracks/{id}", "/tracks/abc"), &query, None)
        .await
        .unwrap();

    assert_eq!(value, json!({ "id": "abc" }));

    let request = &transport.requests_to("/tracks/abc")[0];
    assert_eq!(request.url.host_str(), Some("api.spotify.com"));
    assert_eq!(request.headers.get(AUTHORIZATION).unwrap(), "Bearer valid-token");
    assert_eq!(query_param(request, "market").as_deref(), Some("SE"));
    assert_eq!(query_param(request, "limit"), None);
}

#[tokio::test]
async fn test_empty_body_decodes_to_null() {
    let transport = Arc::new(MockTransport::new());
    transport.on(Method::PUT, "/me/player/pause", empty_response(204));

    let value = pipeline(&transport)
        .request(&Route::put("/me/player/pause", "/me/player/pause"), &Query::new(), None)
        .await
        .unwrap();

    assert_eq!(value, Value::Null);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_waits_for_retry_after() {
    let transport = Arc::new(MockTransport::new());
    transport
        .on(Method::GET, "/tracks/abc", rate_limited("1"))
        .on_json(Method::GET, "/tracks/abc", 200, json!({ "id": "abc" }));

    let started = Instant::now();
    let value = pipeline(&transport)
        .request(&Route::get("/tracks/{id}", "/tracks/abc"), &Query::new(), None)
        .await
        .unwrap();

    assert_eq!(value, json!({ "id": "abc" }));
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(transport.count("/tracks/abc"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_accepts_fractional_retry_after() {
    let transport = Arc::new(MockTransport::new());
    transport
        .on(Method::GET, "/me", rate_limited("0.5"))
        .on_json(Method::GET, "/me", 200, json!({ "id": "me" }));

    let started = Instant::now();
    pipeline(&transport)
        .request(&Route::get("/me", "/me"), &Query::new(), None)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(500));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let transport = Arc::new(MockTransport::new());
    transport.on(Method::GET, "/tracks/missing", error_response(404, "Non existing id"));

    let err = pipeline(&transport)
        .request(&Route::get("/tracks/{id}", "/tracks/missing"), &Query::new(), None)
        .await
        .unwrap_err();

    match &err {
        Error::NotFound(api_error) => {
            assert_eq!(api_error.status, 404);
            assert_eq!(api_error.message, "Non existing id");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(err.status(), Some(404));
    assert_eq!(transport.count("/tracks/missing"), 1);
}

#[tokio::test]
async fn test_status_mapping() {
    let cases = [
        (400, "/bad"),
        (401, "/unauthorized"),
        (403, "/forbidden"),
        (418, "/teapot"),
    ];

    let transport = Arc::new(MockTransport::new());
    for (status, path) in cases {
        transport.on(Method::GET, path, error_response(status, "nope"));
    }
    let pipeline = pipeline(&transport);

    for (status, path) in cases {
        let err = pipeline
            .request(&Route::get("/status", path), &Query::new(), None)
            .await
            .unwrap_err();

        let mapped = match (status, &err) {
            (400, Error::BadRequest(_)) => true,
            (401, Error::Unauthorized(_)) => true,
            (403, Error::Forbidden(_)) => true,
            (418, Error::Api(_)) => true,
            _ => false,
        };
        assert!(mapped, "status {status} mapped to {err:?}");
        assert_eq!(err.status(), Some(status));
        assert_eq!(transport.count(path), 1);
    }
}

#[tokio::test]
async fn test_error_without_envelope_uses_raw_body() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
        Method::GET,
        "/me",
        HttpResponse::new(StatusCode::FORBIDDEN, "User not registered in the Developer Dashboard"),
    );

    let err = pipeline(&transport)
        .request(&Route::get("/me", "/me"), &Query::new(), None)
        .await
        .unwrap_err();

    match err {
        Error::Forbidden(api_error) => {
            assert_eq!(api_error.status, 403);
            assert_eq!(api_error.message, "User not registered in the Developer Dashboard");
        }
        other => panic!("expected Forbidden, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_back_off_then_succeed() {
    let transport = Arc::new(MockTransport::new());
    transport
        .on(Method::GET, "/albums/abc", error_response(500, "Server error"))
        .on(Method::GET, "/albums/abc", error_response(502, "Bad gateway"))
        .on_json(Method::GET, "/albums/abc", 200, json!({ "id": "abc" }));

    let started = Instant::now();
    let value = pipeline(&transport)
        .request(&Route::get("/albums/{id}", "/albums/abc"), &Query::new(), None)
        .await
        .unwrap();

    assert_eq!(value["id"], "abc");
    // 1s after the first failure, 2s after the second
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(transport.count("/albums/abc"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_server_errors_exhaust_retries() {
    let transport = Arc::new(MockTransport::new());
    transport.on(Method::GET, "/albums/abc", error_response(503, "Service unavailable"));

    let err = pipeline(&transport)
        .request(&Route::get("/albums/{id}", "/albums/abc"), &Query::new(), None)
        .await
        .unwrap_err();

    match err {
        Error::RetriesExhausted {
            method,
            path,
            attempts,
            last_status,
        } => {
            assert_eq!(method, "GET");
            assert_eq!(path, "/albums/abc");
            assert_eq!(attempts, 5);
            assert_eq!(last_status, 503);
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(transport.count("/albums/abc"), 5);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retries_are_bounded() {
    let transport = Arc::new(MockTransport::new());
    transport.on(Method::GET, "/search", rate_limited("2"));

    let pipeline = pipeline(&transport).with_retry_policy(RetryPolicy {
        max_attempts: 3,
        ..RetryPolicy::default()
    });

    let err = pipeline
        .request(&Route::get("/search", "/search"), &Query::new(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::RetriesExhausted {
            attempts: 3,
            last_status: 429,
            ..
        }
    ));
    assert_eq!(transport.count("/search"), 3);
}

#[tokio::test]
async fn test_transport_errors_are_not_retried() {
    let transport = Arc::new(MockTransport::new());

    let err = pipeline(&transport)
        .request(&Route::get("/unscripted", "/unscripted"), &Query::new(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(transport.count("/unscripted"), 1);
}

#[test]
fn test_backoff_doubles_and_caps() {
    let policy = RetryPolicy::default();

    assert_eq!(policy.backoff(1), Duration::from_secs(1));
    assert_eq!(policy.backoff(2), Duration::from_secs(2));
    assert_eq!(policy.backoff(3), Duration::from_secs(4));
    assert_eq!(policy.backoff(6), Duration::from_secs(30));
    assert_eq!(policy.backoff(40), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_same_route_calls_do_not_interleave() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(100)));
    transport
        .on_json(Method::GET, "/tracks/a", 200, json!({ "id": "a" }))
        .on_json(Method::GET, "/tracks/b", 200, json!({ "id": "b" }));
    let pipeline = pipeline(&transport);

    let route_a = Route::get("/tracks/{id}", "/tracks/a");
    let route_b = Route::get("/tracks/{id}", "/tracks/b");
    let query = Query::new();

    let (a, b) = tokio::join!(
        pipeline.request(&route_a, &query, None),
        pipeline.request(&route_b, &query, None)
    );
    a.unwrap();
    b.unwrap();

    let phases: Vec<Phase> = transport.events().iter().map(|event| event.phase).collect();
    assert_eq!(phases, vec![Phase::Start, Phase::End, Phase::Start, Phase::End]);
}

#[tokio::test(start_paused = true)]
async fn test_route_lock_is_held_across_retries() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(10)));
    transport
        .on(Method::GET, "/tracks/a", rate_limited("1"))
        .on_json(Method::GET, "/tracks/a", 200, json!({ "id": "a" }))
        .on_json(Method::GET, "/tracks/b", 200, json!({ "id": "b" }));
    let pipeline = pipeline(&transport);

    let route_a = Route::get("/tracks/{id}", "/tracks/a");
    let route_b = Route::get("/tracks/{id}", "/tracks/b");
    let query = Query::new();

    let (a, b) = tokio::join!(
        pipeline.request(&route_a, &query, None),
        pipeline.request(&route_b, &query, None)
    );
    a.unwrap();
    b.unwrap();

    let paths: Vec<String> = transport
        .events()
        .iter()
        .filter(|event| event.phase == Phase::Start)
        .map(|event| event.path.clone())
        .collect();
    assert_eq!(paths, vec!["/tracks/a", "/tracks/a", "/tracks/b"]);
}

#[tokio::test(start_paused = true)]
async fn test_different_routes_run_concurrently() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(100)));
    transport
        .on_json(Method::GET, "/tracks/a", 200, json!({ "id": "a" }))
        .on_json(Method::GET, "/albums/b", 200, json!({ "id": "b" }));
    let pipeline = pipeline(&transport);

    let track_route = Route::get("/tracks/{id}", "/tracks/a");
    let album_route = Route::get("/albums/{id}", "/albums/b");
    let query = Query::new();

    let started = Instant::now();
    let (a, b) = tokio::join!(
        pipeline.request(&track_route, &query, None),
        pipeline.request(&album_route, &query, None)
    );
    a.unwrap();
    b.unwrap();

    let phases: Vec<Phase> = transport.events().iter().map(|event| event.phase).collect();
    assert_eq!(phases, vec![Phase::Start, Phase::Start, Phase::End, Phase::End]);
    assert!(started.elapsed() < Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_same_path_with_different_method_is_separate_route() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(100)));
    transport
        .on_json(Method::GET, "/me/tracks", 200, json!({ "items": [] }))
        .on(Method::PUT, "/me/tracks", empty_response(200));
    let pipeline = pipeline(&transport);

    let get = Route::get("/me/tracks", "/me/tracks");
    let put = Route::put("/me/tracks", "/me/tracks");
    let query = Query::new();

    let (a, b) = tokio::join!(
        pipeline.request(&get, &query, None),
        pipeline.request(&put, &query, None)
    );
    a.unwrap();
    b.unwrap();

    let phases: Vec<Phase> = transport.events().iter().map(|event| event.phase).collect();
    assert_eq!(phases, vec![Phase::Start, Phase::Start, Phase::End, Phase::End]);
}

#[tokio::test]
async fn test_token_expiring_while_queued_is_renewed() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(400)));
    transport.on_json(Method::GET, "/markets", 200, json!({ "markets": [] }));

    let short_lived = Token::new(
        "short-lived",
        Some(chrono::Utc::now() + chrono::Duration::milliseconds(200)),
        None,
    );
    let tokens = TokenManager::new(Credentials::new("client_id", "client_secret"), transport.clone())
        .with_token(short_lived);
    let pipeline = RequestPipeline::new(tokens, transport.clone());
    let route = Route::get("/markets", "/markets");
    let query = Query::new();

    // The second call takes its token right away, then waits for the lock
    // until after that token has expired
    let (first, second) = tokio::join!(
        pipeline.request(&route, &query, None),
        pipeline.request(&route, &query, None)
    );
    first.unwrap();
    second.unwrap();

    let requests = transport.requests_to("/markets");
    assert_eq!(requests[0].headers.get(AUTHORIZATION).unwrap(), "Bearer short-lived");
    assert_eq!(requests[1].headers.get(AUTHORIZATION).unwrap(), "Bearer test-token");
    assert_eq!(transport.count(common::TOKEN_PATH), 1);
}
