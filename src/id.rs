use crate::Error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumString};

/// Host serving the public web player links, e.g. `https://open.spotify.com/track/<id>`.
pub(crate) static SPOTIFY_WEB_HOST: &str = "open.spotify.com";

/// Scheme prefix of Spotify URIs, e.g. `spotify:track:<id>`.
pub(crate) static SPOTIFY_URI_SCHEME: &str = "spotify";

/// The category of a catalog resource.
///
/// Every cached entity belongs to exactly one kind, and ids are only unique
/// within a kind.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Track,
    Album,
    Artist,
    Playlist,
    User,
    Show,
    Episode,
}

/// The result of parsing a user supplied identifier.
///
/// `kind` is only known when the input was a URI or a web URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub kind: Option<EntityKind>,
    pub id: String,
}

impl Identifier {
    /// The canonical URI for this identifier, if its kind is known.
    pub fn uri(&self) -> Option<String> {
        self.kind
            .map(|kind| format!("{SPOTIFY_URI_SCHEME}:{kind}:{}", self.id))
    }
}

/// Anything that can be addressed by a Spotify URI.
///
/// Used by calls that take a list of items, such as adding tracks and
/// episodes to a playlist or queueing playback.
pub trait HasUri {
    fn uri(&self) -> String;
}

/// The URI of `item`, rejecting URIs without an id such as those of local
/// files.
pub(crate) fn require_uri(item: &(impl HasUri + ?Sized)) -> Result<String, Error> {
    let uri = item.uri();
    if uri.trim().is_empty() || uri.ends_with(':') {
        return Err(Error::InvalidArgument(format!(
            "item has no addressable URI: {uri:?}"
        )));
    }
    Ok(uri)
}

impl HasUri for str {
    fn uri(&self) -> String {
        self.to_string()
    }
}

impl HasUri for &str {
    fn uri(&self) -> String {
        (*self).to_string()
    }
}

impl HasUri for String {
    fn uri(&self) -> String {
        self.clone()
    }
}

impl<T: HasUri + ?Sized> HasUri for Arc<T> {
    fn uri(&self) -> String {
        (**self).uri()
    }
}

/// Parse a bare id, a `spotify:<kind>:<id>` URI or an
/// `https://open.spotify.com/<kind>/<id>` URL.
///
/// The URI form is tried first, then the URL form, and anything else is
/// treated as a raw id.
///
/// # Example
///
/// ```
/// use spotifyrs::{parse_identifier, EntityKind};
///
/// let parsed = parse_identifier("spotify:track:6rqhFgbbKwnb9MLmUQDhG6").unwrap();
/// assert_eq!(parsed.kind, Some(EntityKind::Track));
/// assert_eq!(parsed.id, "6rqhFgbbKwnb9MLmUQDhG6");
/// ```
pub fn parse_identifier(input: &str) -> Result<Identifier, Error> {
    let input = input.trim();

    if let Some(identifier) = parse_uri(input)? {
        return Ok(identifier);
    }

    if let Some(identifier) = parse_url(input)? {
        return Ok(identifier);
    }

    validate_id(input)?;

    Ok(Identifier {
        kind: None,
        id: input.to_string(),
    })
}

/// Parse `input` and return its id, failing if the input names a different
/// kind than `expected`.
pub fn parse_argument(input: &str, expected: EntityKind) -> Result<String, Error> {
    let identifier = parse_identifier(input)?;

    match identifier.kind {
        Some(kind) if kind != expected => Err(Error::InvalidArgument(format!(
            "expected a {expected} identifier, got a {kind} identifier: {input}"
        ))),
        _ => Ok(identifier.id),
    }
}

fn parse_uri(input: &str) -> Result<Option<Identifier>, Error> {
    let mut parts = input.split(':');

    if parts.next() != Some(SPOTIFY_URI_SCHEME) {
        return Ok(None);
    }

    let (Some(kind), Some(id), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::InvalidArgument(format!(
            "malformed Spotify URI: {input}"
        )));
    };

    let kind = parse_kind(kind, input)?;
    validate_id(id)?;

    Ok(Some(Identifier {
        kind: Some(kind),
        id: id.to_string(),
    }))
}

fn parse_url(input: &str) -> Result<Option<Identifier>, Error> {
    if !input.starts_with("http://") && !input.starts_with("https://") {
        return Ok(None);
    }

    let url = url::Url::parse(input)
        .map_err(|e| Error::InvalidArgument(format!("malformed Spotify link {input}: {e}")))?;

    if url.host_str() != Some(SPOTIFY_WEB_HOST) {
        return Err(Error::InvalidArgument(format!(
            "not a Spotify link: {input}"
        )));
    }

    // Localised links look like /intl-de/track/<id>
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|segment| !segment.is_empty() && !segment.starts_with("intl-"))
                .collect()
        })
        .unwrap_or_default();

    let [kind, id] = segments.as_slice() else {
        return Err(Error::InvalidArgument(format!(
            "malformed Spotify link: {input}"
        )));
    };

    let kind = parse_kind(kind, input)?;
    validate_id(id)?;

    Ok(Some(Identifier {
        kind: Some(kind),
        id: id.to_string(),
    }))
}

fn parse_kind(kind: &str, input: &str) -> Result<EntityKind, Error> {
    kind.parse::<EntityKind>().map_err(|_| {
        Error::InvalidArgument(format!("unsupported resource kind `{kind}` in {input}"))
    })
}

fn validate_id(id: &str) -> Result<(), Error> {
    let invalid = id.is_empty()
        || id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | ':' | '?' | '#'));

    if invalid {
        return Err(Error::InvalidArgument(format!("invalid id: {id:?}")));
    }

    Ok(())
}
