use crate::http::{HttpRequest, HttpResponse, RequestBody, Transport};
use crate::{Error, SpotifyClient};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumString};
use url::Url;

pub(crate) static SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub(crate) static SPOTIFY_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";

/// Application credentials issued by the Spotify developer dashboard.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Read credentials from `SPOTIFY_CLIENT_ID` and `SPOTIFY_CLIENT_SECRET`.
    pub fn from_env() -> Result<Self, Error> {
        let read = |name: &str| {
            std::env::var(name)
                .map_err(|_| Error::InvalidArgument(format!("environment variable {name} is not set")))
        };

        Ok(Self::new(
            read("SPOTIFY_CLIENT_ID")?,
            read("SPOTIFY_CLIENT_SECRET")?,
        ))
    }

    /// `Basic` authorization header value for the token endpoint.
    fn basic_authorization(&self) -> String {
        let encode = |value: &str| url::form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>();
        let pair = format!("{}:{}", encode(&self.client_id), encode(&self.client_secret));
        format!("Basic {}", STANDARD.encode(pair))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// An access token together with its expiry and optional refresh token.
///
/// Tokens are replaced as a whole on every exchange. Serialize one to
/// persist a user session and hand it back with
/// [`SpotifyClient::with_token`](crate::SpotifyClient::with_token).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    /// When the access token stops being valid. `None` means unknown and is
    /// treated as already expired.
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl Token {
    pub fn new(
        access_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
            refresh_token,
            scope: None,
        }
    }

    /// Whether the token has passed its expiry. A token expiring exactly now
    /// is still valid.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() > expires_at,
            None => true,
        }
    }
}

/// Callback invoked with the new token after every successful exchange.
pub type TokenCallback = Arc<dyn Fn(Token) + Send + Sync>;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

enum Grant {
    ClientCredentials,
    RefreshToken(String),
    AuthorizationCode { code: String, redirect_uri: String },
}

impl Grant {
    fn name(&self) -> &'static str {
        match self {
            Grant::ClientCredentials => "client_credentials",
            Grant::RefreshToken(_) => "refresh_token",
            Grant::AuthorizationCode { .. } => "authorization_code",
        }
    }

    fn form(&self) -> Vec<(String, String)> {
        let mut form = vec![("grant_type".to_string(), self.name().to_string())];

        match self {
            Grant::ClientCredentials => {}
            Grant::RefreshToken(refresh_token) => {
                form.push(("refresh_token".to_string(), refresh_token.clone()));
            }
            Grant::AuthorizationCode { code, redirect_uri } => {
                form.push(("code".to_string(), code.clone()));
                form.push(("redirect_uri".to_string(), redirect_uri.clone()));
            }
        }

        form
    }
}

/// Owns the credentials and the current token, and performs token
/// exchanges against the accounts service.
///
/// Concurrent callers that find the token missing or expired wait on a
/// single exchange instead of each starting their own.
pub struct TokenManager {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    token: ArcSwapOption<Token>,
    exchange_lock: tokio::sync::Mutex<()>,
    on_refresh_callback: Option<TokenCallback>,
}

impl TokenManager {
    pub fn new(credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            credentials,
            transport,
            token: ArcSwapOption::from(None),
            exchange_lock: tokio::sync::Mutex::new(()),
            on_refresh_callback: None,
        }
    }

    pub fn with_token(self, token: Token) -> Self {
        self.token.store(Some(Arc::new(token)));
        self
    }

    pub fn with_refresh_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Token) + Send + Sync + 'static,
    {
        self.on_refresh_callback = Some(Arc::new(callback));
        self
    }

    pub(crate) fn set_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = transport;
    }

    pub(crate) fn set_refresh_callback(&mut self, callback: TokenCallback) {
        self.on_refresh_callback = Some(callback);
    }

    pub fn set_token(&self, token: Token) {
        self.token.store(Some(Arc::new(token)));
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The token currently held, valid or not.
    pub fn current_token(&self) -> Option<Arc<Token>> {
        self.token.load_full()
    }

    fn valid_token(&self) -> Option<Arc<Token>> {
        self.token.load_full().filter(|token| !token.is_expired())
    }

    /// Return a valid access token, exchanging for a new one first if needed.
    ///
    /// With no token held this performs a client credentials exchange. An
    /// expired token is refreshed when it carries a refresh token and is
    /// otherwise replaced through client credentials.
    pub async fn get_token(&self) -> Result<Arc<Token>, Error> {
        if let Some(token) = self.valid_token() {
            return Ok(token);
        }

        let _guard = self.exchange_lock.lock().await;

        // Another caller may have completed an exchange while we waited
        if let Some(token) = self.valid_token() {
            return Ok(token);
        }

        let current = self.token.load_full();
        let grant = match current.as_ref().and_then(|token| token.refresh_token.clone()) {
            Some(refresh_token) => Grant::RefreshToken(refresh_token),
            None => Grant::ClientCredentials,
        };

        self.exchange(grant, current.as_deref()).await
    }

    /// Exchange an authorization code for a user token and store it.
    pub async fn authorize(&self, code: &str, redirect_uri: &str) -> Result<Arc<Token>, Error> {
        let _guard = self.exchange_lock.lock().await;

        let grant = Grant::AuthorizationCode {
            code: code.to_string(),
            redirect_uri: redirect_uri.to_string(),
        };

        self.exchange(grant, None).await
    }

    async fn exchange(&self, grant: Grant, previous: Option<&Token>) -> Result<Arc<Token>, Error> {
        let url = Url::parse(SPOTIFY_TOKEN_URL)?;
        let request = HttpRequest::new(Method::POST, url)
            .with_header(AUTHORIZATION, &self.credentials.basic_authorization())?
            .with_body(RequestBody::Form(grant.form()));

        let resp = self
            .transport
            .send(request)
            .await
            .map_err(|e| Error::Authentication {
                status: None,
                message: e.to_string(),
            })?;

        if !resp.status.is_success() {
            return Err(authentication_error(&resp));
        }

        let body: TokenResponse =
            serde_json::from_slice(&resp.body).map_err(|e| Error::Authentication {
                status: Some(resp.status.as_u16()),
                message: format!("invalid token response: {e}"),
            })?;

        let expires_at = match body.expires_in {
            Some(seconds) => Some(
                chrono::Duration::try_seconds(seconds)
                    .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                    .ok_or_else(|| Error::Authentication {
                        status: Some(resp.status.as_u16()),
                        message: format!("invalid expires_in: {seconds}"),
                    })?,
            ),
            None => None,
        };

        let token = Token {
            access_token: body.access_token,
            expires_at,
            refresh_token: body
                .refresh_token
                .or_else(|| previous.and_then(|token| token.refresh_token.clone())),
            scope: body.scope,
        };

        log::info!(
            "Obtained access token via {} grant, expires at {}",
            grant.name(),
            token
                .expires_at
                .map(|expires_at| expires_at.to_rfc3339())
                .unwrap_or_else(|| "unknown".into())
        );

        // Single, quick swap visible to all readers
        let token = Arc::new(token);
        self.token.store(Some(token.clone()));

        if let Some(cb) = &self.on_refresh_callback {
            cb(token.as_ref().clone());
        }

        Ok(token)
    }
}

fn authentication_error(resp: &HttpResponse) -> Error {
    let message = match serde_json::from_slice::<TokenErrorResponse>(&resp.body) {
        Ok(TokenErrorResponse {
            error_description: Some(description),
            ..
        }) => description,
        Ok(TokenErrorResponse {
            error: Some(error), ..
        }) => error,
        _ => String::from_utf8_lossy(&resp.body).trim().to_string(),
    };

    log::debug!("Token exchange failed with {}: {}", resp.status, message);

    Error::Authentication {
        status: Some(resp.status.as_u16()),
        message,
    }
}

/// Authorization scopes a user can grant to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Scope {
    UgcImageUpload,
    UserReadPlaybackState,
    UserModifyPlaybackState,
    UserReadCurrentlyPlaying,
    AppRemoteControl,
    Streaming,
    PlaylistReadPrivate,
    PlaylistReadCollaborative,
    PlaylistModifyPrivate,
    PlaylistModifyPublic,
    UserFollowModify,
    UserFollowRead,
    UserReadPlaybackPosition,
    UserTopRead,
    UserReadRecentlyPlayed,
    UserLibraryModify,
    UserLibraryRead,
    UserReadEmail,
    UserReadPrivate,
}

/// Obtains an authorization code from the user.
///
/// Implementations typically print or open the authorize URL and then read
/// the redirect back, either from stdin or from a local HTTP listener.
#[async_trait]
pub trait AuthorizationCodeSource: Send + Sync {
    /// Send the user to `authorize_url` and return the `code` query
    /// parameter of the resulting redirect.
    async fn authorization_code(&self, authorize_url: &Url) -> Result<String, Error>;
}

impl SpotifyClient {
    /// Build the URL a user visits to grant this application access.
    ///
    /// # Example
    ///
    /// ```
    /// use spotifyrs::{Scope, SpotifyClient};
    ///
    /// let client = SpotifyClient::new("client_id", "client_secret");
    /// let url = client
    ///     .authorize_url("http://127.0.0.1:8888/callback", &[Scope::UserReadPrivate], None, false)
    ///     .unwrap();
    /// assert!(url.as_str().contains("scope=user-read-private"));
    /// ```
    pub fn authorize_url(
        &self,
        redirect_uri: &str,
        scopes: &[Scope],
        state: Option<&str>,
        show_dialog: bool,
    ) -> Result<Url, Error> {
        let scope = scopes
            .iter()
            .map(|scope| scope.as_ref())
            .collect::<Vec<_>>()
            .join(" ");

        let mut params = vec![
            ("client_id", self.http.tokens.credentials().client_id.clone()),
            ("response_type", "code".to_string()),
            ("redirect_uri", redirect_uri.to_string()),
        ];

        if !scope.is_empty() {
            params.push(("scope", scope));
        }

        if let Some(state) = state {
            params.push(("state", state.to_string()));
        }

        if show_dialog {
            params.push(("show_dialog", "true".to_string()));
        }

        Ok(Url::parse_with_params(SPOTIFY_AUTHORIZE_URL, params)?)
    }

    /// Complete the authorization code flow with a code returned to
    /// `redirect_uri`. The resulting user token replaces any token held and
    /// is refreshed automatically from then on.
    pub async fn authorize(&self, code: &str, redirect_uri: &str) -> Result<Arc<Token>, Error> {
        self.http.tokens.authorize(code, redirect_uri).await
    }

    /// Run the whole authorization code flow, asking `source` for the code.
    pub async fn authorize_with(
        &self,
        source: &dyn AuthorizationCodeSource,
        redirect_uri: &str,
        scopes: &[Scope],
    ) -> Result<Arc<Token>, Error> {
        let url = self.authorize_url(redirect_uri, scopes, None, false)?;
        let code = source.authorization_code(&url).await?;
        self.authorize(&code, redirect_uri).await
    }
}
