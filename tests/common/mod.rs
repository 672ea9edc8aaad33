//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use serde_json::{Value, json};
use spotifyrs::{Error, HttpRequest, HttpResponse, SpotifyClient, Token, Transport};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const TOKEN_PATH: &str = "/api/token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    End,
}

/// One side of a request as seen by the transport.
#[derive(Debug, Clone)]
pub struct Event {
    pub phase: Phase,
    pub method: Method,
    pub path: String,
    pub at: Instant,
}

/// Answers requests from per-route response queues.
///
/// Routes are keyed by method and path, with the `/v1` API prefix removed.
/// The last queued response of a route repeats forever. Token requests get
/// a fresh one hour token unless responses were scripted for them.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<(Method, String), VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
    events: Mutex<Vec<Event>>,
    latency: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every request for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn on(&self, method: Method, path: &str, response: HttpResponse) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    pub fn on_json(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.on(method, path, json_response(status, body))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests sent to `path`, in order.
    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| route_path(request) == path)
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    /// Start and end events of API calls, token exchanges excluded.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.path != TOKEN_PATH)
            .cloned()
            .collect()
    }

    fn next_response(&self, method: &Method, path: &str) -> Option<HttpResponse> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&(method.clone(), path.to_string()))?;

        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn record(&self, phase: Phase, method: &Method, path: &str) {
        self.events.lock().unwrap().push(Event {
            phase,
            method: method.clone(),
            path: path.to_string(),
            at: Instant::now(),
        });
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let method = request.method.clone();
        let path = route_path(&request);

        self.requests.lock().unwrap().push(request);
        self.record(Phase::Start, &method, &path);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let response = match self.next_response(&method, &path) {
            Some(response) => Ok(response),
            None if path == TOKEN_PATH => Ok(token_response("test-token", 3600, None)),
            None => Err(Error::Transport(format!(
                "no response scripted for {method} {path}"
            ))),
        };

        self.record(Phase::End, &method, &path);
        response
    }
}

/// Path of a request with the API version prefix removed.
pub fn route_path(request: &HttpRequest) -> String {
    let path = request.url.path();
    path.strip_prefix("/v1").unwrap_or(path).to_string()
}

/// Value of a query parameter of a request.
pub fn query_param(request: &HttpRequest, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}

pub fn json_response(status: u16, body: Value) -> HttpResponse {
    let status = StatusCode::from_u16(status).unwrap();
    HttpResponse::new(status, serde_json::to_vec(&body).unwrap())
}

pub fn empty_response(status: u16) -> HttpResponse {
    HttpResponse::new(StatusCode::from_u16(status).unwrap(), Vec::new())
}

pub fn rate_limited(retry_after: &str) -> HttpResponse {
    let mut response = json_response(
        429,
        json!({ "error": { "status": 429, "message": "API rate limit exceeded" } }),
    );
    response
        .headers
        .insert(RETRY_AFTER, HeaderValue::from_str(retry_after).unwrap());
    response
}

pub fn error_response(status: u16, message: &str) -> HttpResponse {
    json_response(
        status,
        json!({ "error": { "status": status, "message": message } }),
    )
}

pub fn token_response(access_token: &str, expires_in: i64, refresh_token: Option<&str>) -> HttpResponse {
    let mut body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in,
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = json!(refresh_token);
    }
    json_response(200, body)
}

/// A token that stays valid for the duration of a test.
pub fn valid_token() -> Token {
    Token::new(
        "valid-token",
        Some(Utc::now() + chrono::Duration::hours(1)),
        None,
    )
}

/// A client talking to `transport` with a valid token already in place.
pub fn client(transport: &Arc<MockTransport>) -> SpotifyClient {
    SpotifyClient::new("client_id", "client_secret")
        .with_transport(transport.clone())
        .with_token(valid_token())
}

pub fn fixture(name: &str) -> Value {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read_to_string(&path).unwrap();
    serde_json::from_str(&text).unwrap()
}
