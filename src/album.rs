use crate::Artist;
use crate::Copyright;
use crate::Entity;
use crate::EntityCache;
use crate::EntityKind;
use crate::Error;
use crate::ExternalIds;
use crate::ExternalUrls;
use crate::Image;
use crate::Paginator;
use crate::Paging;
use crate::Query;
use crate::ReleaseDatePrecision;
use crate::Restrictions;
use crate::Route;
use crate::SpotifyClient;
use crate::Track;
use crate::deserialize_null_default;
use crate::parse_argument;
use crate::user::parse_arguments;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{AsRefStr, EnumString};

/// Types of album releases.
#[derive(Debug, Serialize, Deserialize, EnumString, AsRefStr, PartialEq, Eq, Copy, Clone)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlbumType {
    /// Standard album release
    #[serde(alias = "ALBUM")]
    Album,
    /// Single or EP
    #[serde(alias = "SINGLE")]
    Single,
    /// Compilation album
    #[serde(alias = "COMPILATION")]
    Compilation,
    /// Any release type not listed above
    #[serde(other)]
    Other,
}

/// Represents an album from the Spotify catalog.
///
/// Albums embedded in tracks are simplified and leave the full album fields
/// (`tracks`, `genres`, `label`, `popularity`, `copyrights`, `external_ids`)
/// empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    /// Unique album identifier, empty for albums of local files
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub id: String,
    /// Album title
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub name: String,
    pub album_type: Option<AlbumType>,
    /// Number of tracks on the album
    pub total_tracks: Option<u32>,
    /// Artists credited on the album
    #[serde(default)]
    pub artists: Vec<Arc<Artist>>,
    /// Cover art in various sizes, widest first
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub images: Vec<Image>,
    /// Release date, as precise as `release_date_precision`
    pub release_date: Option<String>,
    pub release_date_precision: Option<ReleaseDatePrecision>,
    #[serde(default)]
    pub available_markets: Vec<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    /// Web API endpoint for the full album
    pub href: Option<String>,
    pub restrictions: Option<Restrictions>,
    /// How the album relates to the artist, set on artist discography pages
    pub album_group: Option<String>,

    /// First page of the album's tracks
    pub tracks: Option<Paging<Arc<Track>>>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Record label
    pub label: Option<String>,
    /// Popularity score between 0 and 100
    pub popularity: Option<u32>,
    #[serde(default)]
    pub copyrights: Vec<Copyright>,
    pub external_ids: Option<ExternalIds>,
}

impl Album {
    /// Whether this is a full album object rather than a simplified one
    /// embedded in a track.
    pub fn is_full(&self) -> bool {
        self.tracks.is_some()
    }

    /// The release year, parsed from `release_date`.
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.as_deref()?.split('-').next()?.parse().ok()
    }
}

impl Entity for Album {
    const KIND: EntityKind = EntityKind::Album;

    fn id(&self) -> &str {
        &self.id
    }

    fn link(mut self, cache: &EntityCache) -> Self {
        self.artists = cache.intern_all(self.artists);
        self.tracks = self
            .tracks
            .map(|tracks| tracks.map_items(|items| cache.intern_all(items)));
        self
    }
}

/// An album saved in the current user's library.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SavedAlbum {
    /// When the album was saved
    pub added_at: chrono::DateTime<chrono::Utc>,
    pub album: Arc<Album>,
}

#[derive(Deserialize)]
struct Albums {
    #[serde(deserialize_with = "crate::deserialize_skip_null")]
    albums: Vec<Arc<Album>>,
}

impl SpotifyClient {
    /// Get album information by id, URI or link.
    ///
    /// The album's embedded tracks and artists are linked to any instances
    /// already cached.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(client: spotifyrs::SpotifyClient) -> Result<(), spotifyrs::Error> {
    /// let album = client.album("https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy").await?;
    /// println!("{} ({:?})", album.name, album.release_year());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn album(&self, album: &str) -> Result<Arc<Album>, Error> {
        let album_id = parse_argument(album, EntityKind::Album)?;

        let mut query = Query::new();
        query.push_opt("market", self.get_market());

        let resp: Album = self
            .do_request(
                Route::get("/albums/{id}", format!("/albums/{album_id}")),
                query,
                None,
            )
            .await?;

        Ok(self.cache().insert(resp))
    }

    /// Get several albums at once (at most 20).
    pub async fn albums(&self, albums: &[&str]) -> Result<Vec<Arc<Album>>, Error> {
        let ids = parse_arguments(albums, EntityKind::Album)?;

        let mut query = Query::new();
        query
            .push_list("ids", &ids)
            .push_opt("market", self.get_market());

        let resp: Albums = self
            .do_request(Route::get("/albums", "/albums"), query, None)
            .await?;

        Ok(self.cache().insert_all(resp.albums))
    }

    /// Get a page of an album's tracks.
    ///
    /// Tracks on these pages are simplified: their `album` is not set. Tracks
    /// already cached in full are returned as the cached instance.
    pub async fn album_tracks(
        &self,
        album: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<Arc<Track>>, Error> {
        let album_id = parse_argument(album, EntityKind::Album)?;

        let mut query = Query::new();
        query
            .push_opt("market", self.get_market())
            .push_opt("limit", limit)
            .push_opt("offset", offset);

        let resp: Paging<Arc<Track>> = self
            .do_request(
                Route::get("/albums/{id}/tracks", format!("/albums/{album_id}/tracks")),
                query,
                None,
            )
            .await?;

        let cache = self.cache();
        Ok(resp.map_items(|items| cache.intern_all(items)))
    }

    /// Walk all tracks of an album page by page.
    pub fn album_tracks_paginator<'a>(
        &'a self,
        album: &str,
        increment: u32,
        max: u32,
    ) -> Result<Paginator<'a, Arc<Track>>, Error> {
        let album_id = parse_argument(album, EntityKind::Album)?;

        Paginator::new(
            move |offset, limit| {
                let album_id = album_id.clone();
                async move {
                    self.album_tracks(&album_id, Some(limit), Some(offset))
                        .await
                        .map(|page| page.items)
                }
                .boxed()
            },
            increment,
            max,
        )
    }
}
