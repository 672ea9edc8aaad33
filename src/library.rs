//! The current user's saved tracks, albums, episodes and shows.
//!
//! Every call here needs a user token with the `user-library-read` or
//! `user-library-modify` scope.

use crate::EntityKind;
use crate::Error;
use crate::Paginator;
use crate::Paging;
use crate::Query;
use crate::Route;
use crate::SavedAlbum;
use crate::SavedEpisode;
use crate::SavedShow;
use crate::SavedTrack;
use crate::SpotifyClient;
use crate::user::parse_arguments;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Library {
    Tracks,
    Albums,
    Episodes,
    Shows,
}

impl Library {
    fn path(self) -> &'static str {
        match self {
            Library::Tracks => "/me/tracks",
            Library::Albums => "/me/albums",
            Library::Episodes => "/me/episodes",
            Library::Shows => "/me/shows",
        }
    }

    fn contains_path(self) -> &'static str {
        match self {
            Library::Tracks => "/me/tracks/contains",
            Library::Albums => "/me/albums/contains",
            Library::Episodes => "/me/episodes/contains",
            Library::Shows => "/me/shows/contains",
        }
    }

    fn kind(self) -> EntityKind {
        match self {
            Library::Tracks => EntityKind::Track,
            Library::Albums => EntityKind::Album,
            Library::Episodes => EntityKind::Episode,
            Library::Shows => EntityKind::Show,
        }
    }
}

impl SpotifyClient {
    /// Get a page of the current user's saved tracks, most recent first.
    pub async fn saved_tracks(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<SavedTrack>, Error> {
        let page: Paging<SavedTrack> = self.saved_items(Library::Tracks, limit, offset).await?;

        Ok(page.map_items(|items| {
            items
                .into_iter()
                .map(|saved| SavedTrack {
                    added_at: saved.added_at,
                    track: self.cache().insert(Arc::unwrap_or_clone(saved.track)),
                })
                .collect()
        }))
    }

    /// Walk the current user's saved tracks page by page.
    pub fn saved_tracks_paginator(
        &self,
        increment: u32,
        max: u32,
    ) -> Result<Paginator<'_, SavedTrack>, Error> {
        Paginator::new(
            move |offset, limit| {
                async move {
                    self.saved_tracks(Some(limit), Some(offset))
                        .await
                        .map(|page| page.items)
                }
                .boxed()
            },
            increment,
            max,
        )
    }

    pub async fn save_tracks(&self, tracks: &[&str]) -> Result<(), Error> {
        self.change_library(Library::Tracks, tracks, true).await
    }

    pub async fn remove_saved_tracks(&self, tracks: &[&str]) -> Result<(), Error> {
        self.change_library(Library::Tracks, tracks, false).await
    }

    /// Check whether each of `tracks` is saved in the current user's library.
    pub async fn saved_tracks_contains(&self, tracks: &[&str]) -> Result<Vec<bool>, Error> {
        self.library_contains(Library::Tracks, tracks).await
    }

    /// Get a page of the current user's saved albums, most recent first.
    pub async fn saved_albums(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<SavedAlbum>, Error> {
        let page: Paging<SavedAlbum> = self.saved_items(Library::Albums, limit, offset).await?;

        Ok(page.map_items(|items| {
            items
                .into_iter()
                .map(|saved| SavedAlbum {
                    added_at: saved.added_at,
                    album: self.cache().insert(Arc::unwrap_or_clone(saved.album)),
                })
                .collect()
        }))
    }

    /// Walk the current user's saved albums page by page.
    pub fn saved_albums_paginator(
        &self,
        increment: u32,
        max: u32,
    ) -> Result<Paginator<'_, SavedAlbum>, Error> {
        Paginator::new(
            move |offset, limit| {
                async move {
                    self.saved_albums(Some(limit), Some(offset))
                        .await
                        .map(|page| page.items)
                }
                .boxed()
            },
            increment,
            max,
        )
    }

    pub async fn save_albums(&self, albums: &[&str]) -> Result<(), Error> {
        self.change_library(Library::Albums, albums, true).await
    }

    pub async fn remove_saved_albums(&self, albums: &[&str]) -> Result<(), Error> {
        self.change_library(Library::Albums, albums, false).await
    }

    pub async fn saved_albums_contains(&self, albums: &[&str]) -> Result<Vec<bool>, Error> {
        self.library_contains(Library::Albums, albums).await
    }

    /// Get a page of the current user's saved episodes.
    pub async fn saved_episodes(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<SavedEpisode>, Error> {
        let page: Paging<SavedEpisode> =
            self.saved_items(Library::Episodes, limit, offset).await?;

        Ok(page.map_items(|items| {
            items
                .into_iter()
                .map(|saved| SavedEpisode {
                    added_at: saved.added_at,
                    episode: self.cache().insert(Arc::unwrap_or_clone(saved.episode)),
                })
                .collect()
        }))
    }

    pub async fn save_episodes(&self, episodes: &[&str]) -> Result<(), Error> {
        self.change_library(Library::Episodes, episodes, true).await
    }

    pub async fn remove_saved_episodes(&self, episodes: &[&str]) -> Result<(), Error> {
        self.change_library(Library::Episodes, episodes, false).await
    }

    pub async fn saved_episodes_contains(&self, episodes: &[&str]) -> Result<Vec<bool>, Error> {
        self.library_contains(Library::Episodes, episodes).await
    }

    /// Get a page of the shows the current user follows.
    pub async fn saved_shows(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<SavedShow>, Error> {
        let page: Paging<SavedShow> = self.saved_items(Library::Shows, limit, offset).await?;

        Ok(page.map_items(|items| {
            items
                .into_iter()
                .map(|saved| SavedShow {
                    added_at: saved.added_at,
                    show: self.cache().insert(Arc::unwrap_or_clone(saved.show)),
                })
                .collect()
        }))
    }

    pub async fn save_shows(&self, shows: &[&str]) -> Result<(), Error> {
        self.change_library(Library::Shows, shows, true).await
    }

    pub async fn remove_saved_shows(&self, shows: &[&str]) -> Result<(), Error> {
        self.change_library(Library::Shows, shows, false).await
    }

    pub async fn saved_shows_contains(&self, shows: &[&str]) -> Result<Vec<bool>, Error> {
        self.library_contains(Library::Shows, shows).await
    }

    async fn saved_items<T: DeserializeOwned>(
        &self,
        library: Library,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<T>, Error> {
        let mut query = Query::new();
        query
            .push_opt("limit", limit)
            .push_opt("offset", offset)
            .push_opt("market", self.get_market());

        self.do_request(Route::get(library.path(), library.path()), query, None)
            .await
    }

    async fn change_library(&self, library: Library, ids: &[&str], save: bool) -> Result<(), Error> {
        let ids = parse_arguments(ids, library.kind())?;

        let route = if save {
            Route::put(library.path(), library.path())
        } else {
            Route::delete(library.path(), library.path())
        };

        self.do_send(route, Query::new(), Some(serde_json::json!({ "ids": ids })))
            .await
    }

    async fn library_contains(&self, library: Library, ids: &[&str]) -> Result<Vec<bool>, Error> {
        let ids = parse_arguments(ids, library.kind())?;

        let mut query = Query::new();
        query.push_list("ids", &ids);

        self.do_request(
            Route::get(library.contains_path(), library.contains_path()),
            query,
            None,
        )
        .await
    }
}
