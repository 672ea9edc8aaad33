use crate::Album;
use crate::Entity;
use crate::EntityKind;
use crate::Error;
use crate::ExternalUrls;
use crate::Followers;
use crate::Image;
use crate::Paginator;
use crate::Paging;
use crate::Query;
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

/// Represents an artist from the Spotify catalog.
///
/// Artists embedded in tracks and albums are simplified: only the id, name
/// and links are set. Genres, images, followers and popularity are present
/// once the artist itself has been fetched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Artist {
    /// Unique artist identifier, empty for artists of local files
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub id: String,
    /// Artist name
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    /// Web API endpoint for the full artist
    pub href: Option<String>,

    /// Genres the artist is associated with
    #[serde(default)]
    pub genres: Vec<String>,
    /// Artist pictures, widest first
    #[serde(default)]
    pub images: Vec<Image>,
    pub followers: Option<Followers>,
    /// Popularity score between 0 and 100
    pub popularity: Option<u32>,
}

impl Entity for Artist {
    const KIND: EntityKind = EntityKind::Artist;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Relationship between an artist and an album in an artist's discography.
#[derive(Debug, Serialize, Deserialize, EnumString, AsRefStr, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlbumGroup {
    Album,
    Single,
    AppearsOn,
    Compilation,
}

#[derive(Deserialize)]
struct Artists {
    #[serde(deserialize_with = "crate::deserialize_skip_null")]
    artists: Vec<Arc<Artist>>,
}

#[derive(Deserialize)]
struct TopTracks {
    #[serde(deserialize_with = "crate::deserialize_skip_null")]
    tracks: Vec<Arc<Track>>,
}

impl SpotifyClient {
    /// Get an artist by id, URI or link.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(client: spotifyrs::SpotifyClient) -> Result<(), spotifyrs::Error> {
    /// let artist = client.artist("0OdUWJ0sBjDrqHygGUXeCF").await?;
    /// println!("{} has {:?} followers", artist.name, artist.followers);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn artist(&self, artist: &str) -> Result<Arc<Artist>, Error> {
        let artist_id = parse_argument(artist, EntityKind::Artist)?;

        let resp: Artist = self
            .do_request(
                Route::get("/artists/{id}", format!("/artists/{artist_id}")),
                Query::new(),
                None,
            )
            .await?;

        Ok(self.cache().insert(resp))
    }

    /// Get several artists at once (at most 50).
    pub async fn artists(&self, artists: &[&str]) -> Result<Vec<Arc<Artist>>, Error> {
        let ids = parse_arguments(artists, EntityKind::Artist)?;

        let mut query = Query::new();
        query.push_list("ids", &ids);

        let resp: Artists = self
            .do_request(Route::get("/artists", "/artists"), query, None)
            .await?;

        Ok(self.cache().insert_all(resp.artists))
    }

    /// Get an artist's most popular tracks in a market.
    ///
    /// Uses the client's market, or `US` when none is configured.
    pub async fn artist_top_tracks(&self, artist: &str) -> Result<Vec<Arc<Track>>, Error> {
        let artist_id = parse_argument(artist, EntityKind::Artist)?;

        let mut query = Query::new();
        query.push("market", self.get_market().unwrap_or_else(|| "US".into()));

        let resp: TopTracks = self
            .do_request(
                Route::get(
                    "/artists/{id}/top-tracks",
                    format!("/artists/{artist_id}/top-tracks"),
                ),
                query,
                None,
            )
            .await?;

        Ok(self.cache().insert_all(resp.tracks))
    }

    /// Get artists similar to the given one.
    pub async fn artist_related_artists(&self, artist: &str) -> Result<Vec<Arc<Artist>>, Error> {
        let artist_id = parse_argument(artist, EntityKind::Artist)?;

        let resp: Artists = self
            .do_request(
                Route::get(
                    "/artists/{id}/related-artists",
                    format!("/artists/{artist_id}/related-artists"),
                ),
                Query::new(),
                None,
            )
            .await?;

        Ok(self.cache().insert_all(resp.artists))
    }

    /// Get a page of an artist's albums, optionally filtered by group.
    pub async fn artist_albums(
        &self,
        artist: &str,
        include_groups: &[AlbumGroup],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<Arc<Album>>, Error> {
        let artist_id = parse_argument(artist, EntityKind::Artist)?;

        let mut query = Query::new();
        query
            .push_list("include_groups", include_groups)
            .push_opt("market", self.get_market())
            .push_opt("limit", limit)
            .push_opt("offset", offset);

        let resp: Paging<Arc<Album>> = self
            .do_request(
                Route::get("/artists/{id}/albums", format!("/artists/{artist_id}/albums")),
                query,
                None,
            )
            .await?;

        Ok(self.store_page(resp))
    }

    /// Walk an artist's discography page by page.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(client: spotifyrs::SpotifyClient) -> Result<(), spotifyrs::Error> {
    /// let mut albums = client.artist_albums_paginator("0OdUWJ0sBjDrqHygGUXeCF", &[], 50, 200)?;
    /// for album in albums.all().await? {
    ///     println!("{}", album.name);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn artist_albums_paginator<'a>(
        &'a self,
        artist: &str,
        include_groups: &[AlbumGroup],
        increment: u32,
        max: u32,
    ) -> Result<Paginator<'a, Arc<Album>>, Error> {
        let artist_id = parse_argument(artist, EntityKind::Artist)?;
        let include_groups = include_groups.to_vec();

        Paginator::new(
            move |offset, limit| {
                let artist_id = artist_id.clone();
                let include_groups = include_groups.clone();
                async move {
                    self.artist_albums(&artist_id, &include_groups, Some(limit), Some(offset))
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
