use crate::Entity;
use crate::EntityCache;
use crate::EntityKind;
use crate::Episode;
use crate::Error;
use crate::ExternalUrls;
use crate::Followers;
use crate::HasUri;
use crate::Image;
use crate::Paginator;
use crate::Paging;
use crate::Query;
use crate::Route;
use crate::SpotifyClient;
use crate::Track;
use crate::User;
use crate::deserialize_null_default;
use crate::parse_argument;
use crate::id::require_uri;
use crate::user::parse_arguments;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Represents a user-created or editorial playlist.
///
/// Playlists are cached by id. Fetching a playlist again replaces the cached
/// snapshot.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Playlist {
    /// Unique playlist identifier
    pub id: String,
    /// Playlist name
    pub name: String,
    /// Playlist description, may contain HTML
    pub description: Option<String>,
    /// Whether other users can modify the playlist
    #[serde(default)]
    pub collaborative: bool,
    /// `None` when the playlist's visibility is not relevant
    pub public: Option<bool>,
    /// Version identifier, changes on every modification
    pub snapshot_id: Option<String>,
    pub owner: Option<Arc<User>>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub images: Vec<Image>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub href: Option<String>,
    pub followers: Option<Followers>,
    /// Item count, and on full playlists the first page of items
    pub tracks: Option<PlaylistTracks>,
}

impl Playlist {
    /// Number of items on the playlist, if known.
    pub fn total_items(&self) -> Option<u32> {
        self.tracks.as_ref().map(|tracks| tracks.total)
    }

    /// Items of the first page embedded in a full playlist.
    pub fn items(&self) -> &[PlaylistItem] {
        self.tracks
            .as_ref()
            .map(|tracks| tracks.items.as_slice())
            .unwrap_or_default()
    }
}

/// The `tracks` field of a playlist.
///
/// Simplified playlists only carry `href` and `total`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PlaylistTracks {
    pub href: Option<String>,
    #[serde(default)]
    pub total: u32,
    #[serde(default, deserialize_with = "crate::deserialize_skip_null")]
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

/// An entry of a playlist.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaylistItem {
    /// When the item was added, unknown for very old playlists
    pub added_at: Option<DateTime<Utc>>,
    /// Who added the item, unknown for very old playlists
    pub added_by: Option<Arc<User>>,
    #[serde(default)]
    pub is_local: bool,
    /// The track or episode, `None` when it is no longer available
    pub track: Option<PlayableItem>,
}

impl PlaylistItem {
    fn link(mut self, cache: &EntityCache) -> Self {
        self.added_by = self.added_by.map(|user| cache.intern(user));
        self.track = self.track.map(|item| item.link(cache));
        self
    }
}

/// Something that can be played: a track or a podcast episode.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlayableItem {
    Track(Arc<Track>),
    Episode(Arc<Episode>),
}

impl PlayableItem {
    pub fn id(&self) -> &str {
        match self {
            PlayableItem::Track(track) => &track.id,
            PlayableItem::Episode(episode) => &episode.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PlayableItem::Track(track) => &track.name,
            PlayableItem::Episode(episode) => &episode.name,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        match self {
            PlayableItem::Track(track) => track.duration_ms,
            PlayableItem::Episode(episode) => episode.duration_ms,
        }
    }

    pub fn as_track(&self) -> Option<&Arc<Track>> {
        match self {
            PlayableItem::Track(track) => Some(track),
            PlayableItem::Episode(_) => None,
        }
    }

    pub fn as_episode(&self) -> Option<&Arc<Episode>> {
        match self {
            PlayableItem::Track(_) => None,
            PlayableItem::Episode(episode) => Some(episode),
        }
    }

    pub(crate) fn link(self, cache: &EntityCache) -> Self {
        match self {
            PlayableItem::Track(track) => PlayableItem::Track(cache.intern(track)),
            PlayableItem::Episode(episode) => PlayableItem::Episode(cache.intern(episode)),
        }
    }
}

impl HasUri for PlayableItem {
    fn uri(&self) -> String {
        match self {
            PlayableItem::Track(track) => track.uri(),
            PlayableItem::Episode(episode) => episode.uri(),
        }
    }
}

impl Entity for Playlist {
    const KIND: EntityKind = EntityKind::Playlist;

    fn id(&self) -> &str {
        &self.id
    }

    fn link(mut self, cache: &EntityCache) -> Self {
        self.owner = self.owner.map(|owner| cache.intern(owner));
        if let Some(tracks) = self.tracks.as_mut() {
            tracks.items = std::mem::take(&mut tracks.items)
                .into_iter()
                .map(|item| item.link(cache))
                .collect();
        }
        self
    }
}

/// Fields to change with [`SpotifyClient::change_playlist_details`].
/// Fields left as `None` are not modified.
#[derive(Debug, Serialize, Clone, Default)]
pub struct PlaylistDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaborative: Option<bool>,
}

impl PlaylistDetails {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_public(mut self, public: bool) -> Self {
        self.public = Some(public);
        self
    }

    pub fn with_collaborative(mut self, collaborative: bool) -> Self {
        self.collaborative = Some(collaborative);
        self
    }
}

/// Version of a playlist returned by modifications.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlaylistSnapshot {
    pub snapshot_id: String,
}

impl SpotifyClient {
    /// Get a playlist by id, URI or link, including its first page of items.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(client: spotifyrs::SpotifyClient) -> Result<(), spotifyrs::Error> {
    /// let playlist = client.playlist("37i9dQZF1DXcBWIGoYBM5M").await?;
    /// for item in playlist.items() {
    ///     if let Some(playable) = &item.track {
    ///         println!("{}", playable.name());
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn playlist(&self, playlist: &str) -> Result<Arc<Playlist>, Error> {
        let playlist_id = parse_argument(playlist, EntityKind::Playlist)?;

        let mut query = Query::new();
        query
            .push("additional_types", "track,episode")
            .push_opt("market", self.get_market());

        let resp: Playlist = self
            .do_request(
                Route::get("/playlists/{id}", format!("/playlists/{playlist_id}")),
                query,
                None,
            )
            .await?;

        Ok(self.cache().insert(resp))
    }

    /// Get a page of a playlist's items.
    pub async fn playlist_items(
        &self,
        playlist: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<PlaylistItem>, Error> {
        let playlist_id = parse_argument(playlist, EntityKind::Playlist)?;

        let mut query = Query::new();
        query
            .push("additional_types", "track,episode")
            .push_opt("market", self.get_market())
            .push_opt("limit", limit)
            .push_opt("offset", offset);

        let resp: Paging<PlaylistItem> = self
            .do_request(
                Route::get(
                    "/playlists/{id}/tracks",
                    format!("/playlists/{playlist_id}/tracks"),
                ),
                query,
                None,
            )
            .await?;

        let cache = self.cache();
        Ok(resp.map_items(|items| items.into_iter().map(|item| item.link(cache)).collect()))
    }

    /// Walk all items of a playlist page by page.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(client: spotifyrs::SpotifyClient) -> Result<(), spotifyrs::Error> {
    /// let mut items = client.playlist_items_paginator("37i9dQZF1DXcBWIGoYBM5M", 100, 1000)?;
    /// while let Some(page) = items.next().await? {
    ///     println!("fetched {} items", page.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn playlist_items_paginator<'a>(
        &'a self,
        playlist: &str,
        increment: u32,
        max: u32,
    ) -> Result<Paginator<'a, PlaylistItem>, Error> {
        let playlist_id = parse_argument(playlist, EntityKind::Playlist)?;

        Paginator::new(
            move |offset, limit| {
                let playlist_id = playlist_id.clone();
                async move {
                    self.playlist_items(&playlist_id, Some(limit), Some(offset))
                        .await
                        .map(|page| page.items)
                }
                .boxed()
            },
            increment,
            max,
        )
    }

    /// Change a playlist's name, description or visibility.
    pub async fn change_playlist_details(
        &self,
        playlist: &str,
        details: &PlaylistDetails,
    ) -> Result<(), Error> {
        let playlist_id = parse_argument(playlist, EntityKind::Playlist)?;

        self.do_send(
            Route::put("/playlists/{id}", format!("/playlists/{playlist_id}")),
            Query::new(),
            Some(serde_json::to_value(details)?),
        )
        .await
    }

    /// Add tracks or episodes to a playlist, at `position` or at the end.
    ///
    /// Accepts anything with a URI: URI strings, tracks, episodes or
    /// playable items.
    pub async fn add_items_to_playlist<I: HasUri>(
        &self,
        playlist: &str,
        items: &[I],
        position: Option<u32>,
    ) -> Result<PlaylistSnapshot, Error> {
        let playlist_id = parse_argument(playlist, EntityKind::Playlist)?;
        let uris = items
            .iter()
            .map(require_uri)
            .collect::<Result<Vec<_>, _>>()?;

        let mut body = serde_json::json!({ "uris": uris });
        if let Some(position) = position {
            body["position"] = position.into();
        }

        self.do_request(
            Route::post(
                "/playlists/{id}/tracks",
                format!("/playlists/{playlist_id}/tracks"),
            ),
            Query::new(),
            Some(body),
        )
        .await
    }

    /// Remove every occurrence of the given tracks or episodes from a
    /// playlist.
    ///
    /// With a `snapshot_id` the removal applies to that playlist version.
    pub async fn remove_items_from_playlist<I: HasUri>(
        &self,
        playlist: &str,
        items: &[I],
        snapshot_id: Option<&str>,
    ) -> Result<PlaylistSnapshot, Error> {
        let playlist_id = parse_argument(playlist, EntityKind::Playlist)?;
        let tracks = items
            .iter()
            .map(|item| Ok(serde_json::json!({ "uri": require_uri(item)? })))
            .collect::<Result<Vec<_>, Error>>()?;

        let mut body = serde_json::json!({ "tracks": tracks });
        if let Some(snapshot_id) = snapshot_id {
            body["snapshot_id"] = snapshot_id.into();
        }

        self.do_request(
            Route::delete(
                "/playlists/{id}/tracks",
                format!("/playlists/{playlist_id}/tracks"),
            ),
            Query::new(),
            Some(body),
        )
        .await
    }

    /// Create a playlist owned by `user`.
    pub async fn create_playlist(
        &self,
        user: &str,
        name: &str,
        public: bool,
        collaborative: bool,
        description: Option<&str>,
    ) -> Result<Arc<Playlist>, Error> {
        let user_id = parse_argument(user, EntityKind::User)?;

        let mut body = serde_json::json!({
            "name": name,
            "public": public,
            "collaborative": collaborative,
        });
        if let Some(description) = description {
            body["description"] = description.into();
        }

        let resp: Playlist = self
            .do_request(
                Route::post("/users/{id}/playlists", format!("/users/{user_id}/playlists")),
                Query::new(),
                Some(body),
            )
            .await?;

        Ok(self.cache().insert(resp))
    }

    /// Get a page of a user's public playlists.
    pub async fn user_playlists(
        &self,
        user: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<Arc<Playlist>>, Error> {
        let user_id = parse_argument(user, EntityKind::User)?;

        let mut query = Query::new();
        query.push_opt("limit", limit).push_opt("offset", offset);

        let resp: Paging<Arc<Playlist>> = self
            .do_request(
                Route::get("/users/{id}/playlists", format!("/users/{user_id}/playlists")),
                query,
                None,
            )
            .await?;

        Ok(self.store_page(resp))
    }

    /// Get a page of the playlists the current user owns or follows.
    pub async fn current_user_playlists(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<Arc<Playlist>>, Error> {
        let mut query = Query::new();
        query.push_opt("limit", limit).push_opt("offset", offset);

        let resp: Paging<Arc<Playlist>> = self
            .do_request(Route::get("/me/playlists", "/me/playlists"), query, None)
            .await?;

        Ok(self.store_page(resp))
    }

    /// Get the current cover images of a playlist.
    pub async fn playlist_cover_image(&self, playlist: &str) -> Result<Vec<Image>, Error> {
        let playlist_id = parse_argument(playlist, EntityKind::Playlist)?;

        let images: Option<Vec<Image>> = self
            .do_request(
                Route::get(
                    "/playlists/{id}/images",
                    format!("/playlists/{playlist_id}/images"),
                ),
                Query::new(),
                None,
            )
            .await?;

        Ok(images.unwrap_or_default())
    }

    /// Follow a playlist as the current user.
    pub async fn follow_playlist(&self, playlist: &str, public: bool) -> Result<(), Error> {
        let playlist_id = parse_argument(playlist, EntityKind::Playlist)?;

        self.do_send(
            Route::put(
                "/playlists/{id}/followers",
                format!("/playlists/{playlist_id}/followers"),
            ),
            Query::new(),
            Some(serde_json::json!({ "public": public })),
        )
        .await
    }

    /// Stop following a playlist as the current user.
    pub async fn unfollow_playlist(&self, playlist: &str) -> Result<(), Error> {
        let playlist_id = parse_argument(playlist, EntityKind::Playlist)?;

        self.do_send(
            Route::delete(
                "/playlists/{id}/followers",
                format!("/playlists/{playlist_id}/followers"),
            ),
            Query::new(),
            None,
        )
        .await
    }

    /// Check whether each of `users` follows a playlist.
    pub async fn users_follow_playlist(
        &self,
        playlist: &str,
        users: &[&str],
    ) -> Result<Vec<bool>, Error> {
        let playlist_id = parse_argument(playlist, EntityKind::Playlist)?;
        let ids = parse_arguments(users, EntityKind::User)?;

        let mut query = Query::new();
        query.push_list("ids", &ids);

        self.do_request(
            Route::get(
                "/playlists/{id}/followers/contains",
                format!("/playlists/{playlist_id}/followers/contains"),
            ),
            query,
            None,
        )
        .await
    }
}
