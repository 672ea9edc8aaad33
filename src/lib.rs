#![doc = include_str!("../README.md")]

mod album;
mod artist;
mod auth;
mod browse;
mod cache;
mod episode;
mod http;
mod id;
mod image;
mod library;
mod paginator;
mod playback;
mod playlist;
mod search;
mod show;
mod track;
mod user;

pub use album::*;
pub use artist::*;
pub use auth::*;
pub use browse::*;
pub use cache::*;
pub use episode::*;
pub use http::*;
pub use id::*;
pub use image::*;
pub use library::*;
pub use paginator::*;
pub use playback::*;
pub use playlist::*;
pub use search::*;
pub use show::*;
pub use track::*;
pub use user::*;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;
use strum_macros::{AsRefStr, EnumString};

pub(crate) static SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Error payload returned by the Web API.
///
/// Non-2xx responses carry `{"error": {"status": 404, "message": "..."}}`.
/// When the body has another shape the status comes from the response and
/// the message from the raw body.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Human-readable error message
    #[serde(default)]
    pub message: String,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

/// Errors that can occur when using the spotifyrs library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An identifier or parameter was rejected before any request was made
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The token exchange failed or returned an unusable response
    #[error("Authentication failed: {message}")]
    Authentication {
        status: Option<u16>,
        message: String,
    },
    /// 400 Bad Request
    #[error("Bad request: {0}")]
    BadRequest(ApiError),
    /// 401 Unauthorized
    #[error("Unauthorized: {0}")]
    Unauthorized(ApiError),
    /// 403 Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(ApiError),
    /// 404 Not Found
    #[error("Not found: {0}")]
    NotFound(ApiError),
    /// Any other non-success status
    #[error("Spotify API error: {0}")]
    Api(ApiError),
    /// The call kept being rate limited or failing transiently
    #[error("{method} {path} failed after {attempts} attempts, last status {last_status}")]
    RetriesExhausted {
        method: String,
        path: String,
        attempts: u32,
        last_status: u16,
    },
    /// HTTP request failed (network issues, timeouts, etc.)
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// A custom transport failed to deliver the request
    #[error("Transport error: {0}")]
    Transport(String),
    /// JSON serialization/deserialization failed
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Failed to initialize audio stream
    #[error("Stream initialization error: {0}")]
    StreamInitialization(String),
    /// The track or episode has no preview clip
    #[error("No preview URL available")]
    NoPreviewUrl,
}

impl Error {
    /// The HTTP status behind this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Authentication { status, .. } => *status,
            Error::BadRequest(err)
            | Error::Unauthorized(err)
            | Error::Forbidden(err)
            | Error::NotFound(err)
            | Error::Api(err) => Some(err.status),
            Error::RetriesExhausted { last_status, .. } => Some(*last_status),
            Error::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

/// Main client for the Spotify Web API.
///
/// Every entity returned by the client is registered in its
/// [`EntityCache`], so repeated fetches of the same resource, and the same
/// resource embedded in different responses, share one `Arc`.
///
/// # Example
///
/// ```no_run
/// use spotifyrs::SpotifyClient;
///
/// # async fn example() -> Result<(), spotifyrs::Error> {
/// let client = SpotifyClient::new("your_client_id", "your_client_secret")
///     .with_market("US".to_string());
///
/// let track = client.track("spotify:track:6rqhFgbbKwnb9MLmUQDhG6").await?;
/// println!("Track: {}", track.name);
/// # Ok(())
/// # }
/// ```
///
/// # Thread Safety
///
/// `SpotifyClient` is `Send + Sync` and meant to be shared, for example in
/// an `Arc`. Token refresh and the cache are internally synchronized.
pub struct SpotifyClient {
    http: RequestPipeline,
    cache: EntityCache,
    market: Option<String>,
    locale: Option<String>,
}

impl SpotifyClient {
    /// Create a client authenticating with the client credentials flow.
    ///
    /// ```
    /// use spotifyrs::SpotifyClient;
    ///
    /// let client = SpotifyClient::new("your_client_id", "your_client_secret");
    /// assert!(client.get_token().is_none());
    /// ```
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::from_credentials(Credentials::new(client_id, client_secret))
    }

    pub fn from_credentials(credentials: Credentials) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(reqwest::Client::new());

        Self {
            http: RequestPipeline::new(TokenManager::new(credentials, transport.clone()), transport),
            cache: EntityCache::new(),
            market: None,
            locale: None,
        }
    }

    /// Set a custom HTTP client using the builder pattern.
    ///
    /// This is the place to configure timeouts, proxies or default headers.
    ///
    /// ```
    /// use spotifyrs::SpotifyClient;
    ///
    /// let custom_client = reqwest::Client::builder()
    ///     .timeout(std::time::Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = SpotifyClient::new("client_id", "client_secret").with_client(custom_client);
    /// ```
    pub fn with_client(self, client: reqwest::Client) -> Self {
        self.with_transport(Arc::new(client))
    }

    /// Route every request, including token exchanges, through `transport`.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.http.set_transport(transport);
        self
    }

    /// Resume a previously persisted session.
    pub fn with_token(self, token: Token) -> Self {
        self.http.tokens.set_token(token);
        self
    }

    /// Default market (ISO 3166-1 alpha-2 country code) for calls that
    /// accept one. Enables track relinking.
    pub fn with_market(mut self, market: String) -> Self {
        self.market = Some(market);
        self
    }

    /// Default locale (e.g. `es_MX`) for browse calls.
    pub fn with_locale(mut self, locale: String) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.http.set_retry_policy(retry_policy);
        self
    }

    /// Set a callback invoked with the new token after every successful
    /// token exchange. Use it to persist tokens.
    ///
    /// ```
    /// use spotifyrs::SpotifyClient;
    ///
    /// let client = SpotifyClient::new("client_id", "client_secret")
    ///     .with_token_refresh_callback(|token| {
    ///         println!("New token expires at {:?}", token.expires_at);
    ///     });
    /// ```
    pub fn with_token_refresh_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Token) + Send + Sync + 'static,
    {
        self.http.tokens.set_refresh_callback(Arc::new(callback));
        self
    }

    pub fn get_market(&self) -> Option<String> {
        self.market.clone()
    }

    pub fn get_locale(&self) -> Option<String> {
        self.locale.clone()
    }

    pub fn get_retry_policy(&self) -> RetryPolicy {
        self.http.get_retry_policy()
    }

    /// The token currently held, if any. Useful for persisting a session.
    pub fn get_token(&self) -> Option<Arc<Token>> {
        self.http.tokens.current_token()
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.http.tokens
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.http
    }

    pub(crate) fn market_or_default(&self, market: Option<&str>) -> Option<String> {
        market.map(str::to_string).or_else(|| self.get_market())
    }

    // Perform a call and decode the payload into `T`.
    pub(crate) async fn do_request<T: DeserializeOwned>(
        &self,
        route: Route,
        query: Query,
        body: Option<Value>,
    ) -> Result<T, Error> {
        let value = self
            .http
            .request(&route, &query, body.map(RequestBody::Json))
            .await?;

        match serde_json::from_value(value.clone()) {
            Ok(resp) => Ok(resp),
            Err(e) => {
                if log::log_enabled!(log::Level::Debug) {
                    let pretty_value = serde_json::to_string_pretty(&value).unwrap_or_default();
                    log::debug!("Requested path: {}", route.path);
                    log::debug!("JSON deserialization error: {}", e);
                    log::debug!("Response: {}", pretty_value);
                }
                Err(Error::SerdeJson(e))
            }
        }
    }

    // Perform a call whose response body carries nothing of interest.
    pub(crate) async fn do_send(
        &self,
        route: Route,
        query: Query,
        body: Option<Value>,
    ) -> Result<(), Error> {
        self.http
            .request(&route, &query, body.map(RequestBody::Json))
            .await?;
        Ok(())
    }

    // Register every top level entity of a page in the cache.
    pub(crate) fn store_page<T: Entity>(&self, page: Paging<Arc<T>>) -> Paging<Arc<T>> {
        page.map_items(|items| self.cache.insert_all(items))
    }
}

/// A page of results from an offset/limit list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paging<T> {
    pub href: Option<String>,
    /// Items in the current page. Null entries (removed content) are skipped.
    #[serde(deserialize_with = "deserialize_skip_null")]
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub limit: u32,
    pub next: Option<String>,
    #[serde(default)]
    pub offset: u32,
    pub previous: Option<String>,
    #[serde(default)]
    pub total: u32,
}

impl<T> Paging<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub(crate) fn map_items<U>(self, f: impl FnOnce(Vec<T>) -> Vec<U>) -> Paging<U> {
        Paging {
            href: self.href,
            items: f(self.items),
            limit: self.limit,
            next: self.next,
            offset: self.offset,
            previous: self.previous,
            total: self.total,
        }
    }
}

impl<T> Default for Paging<T> {
    fn default() -> Self {
        Self {
            href: None,
            items: Vec::new(),
            limit: 0,
            next: None,
            offset: 0,
            previous: None,
            total: 0,
        }
    }
}

/// Cursor positions of a [`CursorPaging`] page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cursors {
    pub after: Option<String>,
    pub before: Option<String>,
}

/// A page of results from a cursor based list endpoint (followed artists,
/// recently played).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct CursorPaging<T> {
    pub href: Option<String>,
    #[serde(deserialize_with = "deserialize_skip_null")]
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub limit: u32,
    pub next: Option<String>,
    #[serde(default)]
    pub cursors: Option<Cursors>,
    pub total: Option<u32>,
}

impl<T> CursorPaging<T> {
    /// Cursor to pass as `after` to fetch the following page.
    pub fn after(&self) -> Option<&str> {
        self.cursors.as_ref()?.after.as_deref()
    }

    pub(crate) fn map_items<U>(self, f: impl FnOnce(Vec<T>) -> Vec<U>) -> CursorPaging<U> {
        CursorPaging {
            href: self.href,
            items: f(self.items),
            limit: self.limit,
            next: self.next,
            cursors: self.cursors,
            total: self.total,
        }
    }
}

/// Links to a resource on the web.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// Industry identifiers of a track or album.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
    /// International Standard Recording Code
    pub isrc: Option<String>,
    /// International Article Number
    pub ean: Option<String>,
    /// Universal Product Code
    pub upc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Followers {
    pub href: Option<String>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Copyright {
    pub text: String,
    /// `C` for the copyright, `P` for the sound recording (performance) copyright
    #[serde(rename = "type")]
    pub kind: String,
}

/// How precise a release date is.
#[derive(Debug, Serialize, Deserialize, EnumString, AsRefStr, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReleaseDatePrecision {
    Year,
    Month,
    Day,
}

/// Playback restriction attached to a track, album or episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
    pub reason: String,
}

// Utility function to deserialize a null value as a default value
pub(crate) fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    Option::deserialize(deserializer).map(|opt| opt.unwrap_or_default())
}

// Deserialize a list, dropping null entries
pub(crate) fn deserialize_skip_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}
