//! Authenticated request execution.
//!
//! [`RequestPipeline`] turns a [`Route`] plus query and body into a JSON
//! value. It attaches the bearer token, serializes calls that share a route,
//! and retries rate limited and transiently failing calls.

use crate::auth::TokenManager;
use crate::{ApiError, Error, SPOTIFY_API_BASE_URL};
use async_recursion::async_recursion;
use async_trait::async_trait;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use url::Url;

/// A request body, either JSON or `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// A fully prepared HTTP request handed to a [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL with the query string already encoded.
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: reqwest::header::HeaderName, value: &str) -> Result<Self, Error> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::InvalidArgument(format!("invalid {name} header: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// The raw result of an HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Sends prepared requests over the network.
///
/// Implemented for [`reqwest::Client`]. Anything else implementing it (an
/// in-memory fake, a recording proxy) can be plugged into the client with
/// [`SpotifyClient::with_transport`](crate::SpotifyClient::with_transport).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let mut builder = self
            .request(request.method.clone(), request.url)
            .headers(request.headers);

        builder = match request.body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Form(fields)) => builder.form(&fields),
            // Bodyless PUT/POST calls are rejected with 411 without this
            None => match request.method {
                Method::PUT | Method::POST => builder.header(CONTENT_LENGTH, 0),
                _ => builder,
            },
        };

        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// An API endpoint: an HTTP method, the path template naming the endpoint,
/// and the concrete path with arguments filled in.
///
/// Calls are serialized per `(method, template)` pair, so
/// `GET /tracks/{id}` for two different tracks share one lock while
/// `GET /albums/{id}` proceeds independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub template: &'static str,
    pub path: String,
}

impl Route {
    pub fn new(method: Method, template: &'static str, path: impl Into<String>) -> Self {
        Self {
            method,
            template,
            path: path.into(),
        }
    }

    pub fn get(template: &'static str, path: impl Into<String>) -> Self {
        Self::new(Method::GET, template, path)
    }

    pub fn post(template: &'static str, path: impl Into<String>) -> Self {
        Self::new(Method::POST, template, path)
    }

    pub fn put(template: &'static str, path: impl Into<String>) -> Self {
        Self::new(Method::PUT, template, path)
    }

    pub fn delete(template: &'static str, path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, template, path)
    }

    fn bucket_key(&self) -> (Method, &'static str) {
        (self.method.clone(), self.template)
    }
}

/// Query string parameters, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    pub fn push_opt<V: ToString>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    /// Push a comma separated list, skipping the key when `values` is empty.
    pub fn push_list<I, V>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|value| value.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");

        if !joined.is_empty() {
            self.push(key, joined);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

/// Bounds for retrying rate limited (429) and transiently failing
/// (500, 502, 503) calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt of a 5xx retry. Doubles per attempt.
    pub base_backoff: Duration,
    /// Upper bound on the exponential backoff.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff after the given failed attempt (1 based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

type Bucket = Arc<tokio::sync::Mutex<()>>;

/// Executes authenticated API calls with per-route serialization and retry.
pub struct RequestPipeline {
    pub(crate) tokens: TokenManager,
    transport: Arc<dyn Transport>,
    retry_policy: RetryPolicy,
    buckets: Mutex<HashMap<(Method, &'static str), Bucket>>,
}

impl RequestPipeline {
    pub fn new(tokens: TokenManager, transport: Arc<dyn Transport>) -> Self {
        Self {
            tokens,
            transport,
            retry_policy: RetryPolicy::default(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn get_retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub(crate) fn set_transport(&mut self, transport: Arc<dyn Transport>) {
        self.tokens.set_transport(transport.clone());
        self.transport = transport;
    }

    pub(crate) fn set_retry_policy(&mut self, retry_policy: RetryPolicy) {
        self.retry_policy = retry_policy;
    }

    /// Perform an authenticated call against the Web API and return the
    /// decoded JSON payload. An empty success body yields `Value::Null`.
    ///
    /// The token is obtained before the route lock is taken, checked again
    /// once the lock is held, and reused for every retry of this call.
    pub async fn request(
        &self,
        route: &Route,
        query: &Query,
        body: Option<RequestBody>,
    ) -> Result<Value, Error> {
        let mut token = self.tokens.get_token().await?;
        let url = build_url(route, query)?;

        let bucket = self.bucket(route);
        let _guard = bucket.lock().await;

        // The wait for the lock may have outlived the token
        if token.is_expired() {
            token = self.tokens.get_token().await?;
        }

        self.attempt(route, &url, &token.access_token, &body, 1)
            .await
    }

    /// Download a resource that lives outside the API, such as cover art.
    ///
    /// No bearer token is sent and no retry is attempted.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, Error> {
        let url = Url::parse(url)?;
        let resp = self
            .transport
            .send(HttpRequest::new(Method::GET, url.clone()))
            .await?;

        if resp.status.is_success() {
            return Ok(resp.body);
        }

        Err(map_error(resp.status, &resp.body, &url))
    }

    fn bucket(&self, route: &Route) -> Bucket {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(route.bucket_key())
            .or_default()
            .clone()
    }

    #[async_recursion]
    async fn attempt(
        &self,
        route: &Route,
        url: &Url,
        bearer: &str,
        body: &Option<RequestBody>,
        attempt: u32,
    ) -> Result<Value, Error> {
        let mut request = HttpRequest::new(route.method.clone(), url.clone())
            .with_header(AUTHORIZATION, &format!("Bearer {bearer}"))?;
        request.body = body.clone();

        let resp = self.transport.send(request).await?;
        let status = resp.status;

        if status.is_success() {
            return decode_body(url, &resp.body);
        }

        if !is_retryable(status) {
            return Err(map_error(status, &resp.body, url));
        }

        if attempt >= self.retry_policy.max_attempts {
            log::warn!(
                "Giving up on {} {} after {attempt} attempts (last status {status})",
                route.method,
                route.path
            );
            return Err(Error::RetriesExhausted {
                method: route.method.to_string(),
                path: route.path.clone(),
                attempts: attempt,
                last_status: status.as_u16(),
            });
        }

        let delay = if status == StatusCode::TOO_MANY_REQUESTS {
            retry_after(&resp.headers).unwrap_or_else(|| self.retry_policy.backoff(attempt))
        } else {
            self.retry_policy.backoff(attempt)
        };

        log::warn!(
            "{} {} returned {status}, retrying in {:.3}s (attempt {attempt} of {})",
            route.method,
            route.path,
            delay.as_secs_f64(),
            self.retry_policy.max_attempts
        );

        tokio::time::sleep(delay).await;

        self.attempt(route, url, bearer, body, attempt + 1).await
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
    )
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds: f64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

pub(crate) fn build_url(route: &Route, query: &Query) -> Result<Url, Error> {
    let mut url = Url::parse(&format!("{SPOTIFY_API_BASE_URL}{}", route.path))?;

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.pairs());
    }

    Ok(url)
}

fn decode_body(url: &Url, body: &[u8]) -> Result<Value, Error> {
    // If it's an empty body, just encode a null value
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body)?
    };

    if log::log_enabled!(log::Level::Trace) {
        let pretty_value = serde_json::to_string_pretty(&value).unwrap_or_default();
        log::trace!("Requested URL: {}", url);
        log::trace!("Response {}", pretty_value);
    }

    Ok(value)
}

pub(crate) fn map_error(status: StatusCode, body: &[u8], url: &Url) -> Error {
    let err = match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error,
        Err(_) => ApiError {
            status: status.as_u16(),
            message: match String::from_utf8_lossy(body).trim() {
                "" => status.canonical_reason().unwrap_or_default().to_string(),
                text => text.to_string(),
            },
        },
    };

    if log::log_enabled!(log::Level::Debug) {
        log::debug!("Requested URL: {}", url);
        log::debug!("Spotify API Error: {}", err);
    }

    match status {
        StatusCode::BAD_REQUEST => Error::BadRequest(err),
        StatusCode::UNAUTHORIZED => Error::Unauthorized(err),
        StatusCode::FORBIDDEN => Error::Forbidden(err),
        StatusCode::NOT_FOUND => Error::NotFound(err),
        _ => Error::Api(err),
    }
}
