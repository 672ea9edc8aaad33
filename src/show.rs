use crate::Entity;
use crate::EntityCache;
use crate::EntityKind;
use crate::Episode;
use crate::Error;
use crate::ExternalUrls;
use crate::Image;
use crate::Paginator;
use crate::Paging;
use crate::Query;
use crate::Route;
use crate::SpotifyClient;
use crate::deserialize_null_default;
use crate::parse_argument;
use crate::user::parse_arguments;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A podcast show.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Show {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub publisher: Option<String>,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub href: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub images: Vec<Image>,
    #[serde(default)]
    pub languages: Vec<String>,
    /// `audio`, `video` or `mixed`
    pub media_type: Option<String>,
    #[serde(default)]
    pub available_markets: Vec<String>,
    pub total_episodes: Option<u32>,
    /// First page of episodes, on full show objects only
    pub episodes: Option<Paging<Arc<Episode>>>,
}

impl Entity for Show {
    const KIND: EntityKind = EntityKind::Show;

    fn id(&self) -> &str {
        &self.id
    }

    fn link(mut self, cache: &EntityCache) -> Self {
        self.episodes = self
            .episodes
            .map(|episodes| episodes.map_items(|items| cache.intern_all(items)));
        self
    }
}

/// A show saved in the current user's library.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SavedShow {
    pub added_at: chrono::DateTime<chrono::Utc>,
    pub show: Arc<Show>,
}

#[derive(Deserialize)]
struct Shows {
    #[serde(deserialize_with = "crate::deserialize_skip_null")]
    shows: Vec<Arc<Show>>,
}

impl SpotifyClient {
    /// Get a podcast show by id, URI or link.
    pub async fn show(&self, show: &str) -> Result<Arc<Show>, Error> {
        let show_id = parse_argument(show, EntityKind::Show)?;

        let mut query = Query::new();
        query.push_opt("market", self.get_market());

        let resp: Show = self
            .do_request(
                Route::get("/shows/{id}", format!("/shows/{show_id}")),
                query,
                None,
            )
            .await?;

        Ok(self.cache().insert(resp))
    }

    /// Get several shows at once (at most 50).
    pub async fn shows(&self, shows: &[&str]) -> Result<Vec<Arc<Show>>, Error> {
        let ids = parse_arguments(shows, EntityKind::Show)?;

        let mut query = Query::new();
        query
            .push_list("ids", &ids)
            .push_opt("market", self.get_market());

        let resp: Shows = self
            .do_request(Route::get("/shows", "/shows"), query, None)
            .await?;

        Ok(self.cache().insert_all(resp.shows))
    }

    /// Get a page of a show's episodes.
    pub async fn show_episodes(
        &self,
        show: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<Arc<Episode>>, Error> {
        let show_id = parse_argument(show, EntityKind::Show)?;

        let mut query = Query::new();
        query
            .push_opt("market", self.get_market())
            .push_opt("limit", limit)
            .push_opt("offset", offset);

        let resp: Paging<Arc<Episode>> = self
            .do_request(
                Route::get("/shows/{id}/episodes", format!("/shows/{show_id}/episodes")),
                query,
                None,
            )
            .await?;

        let cache = self.cache();
        Ok(resp.map_items(|items| cache.intern_all(items)))
    }

    /// Walk all episodes of a show page by page.
    pub fn show_episodes_paginator<'a>(
        &'a self,
        show: &str,
        increment: u32,
        max: u32,
    ) -> Result<Paginator<'a, Arc<Episode>>, Error> {
        let show_id = parse_argument(show, EntityKind::Show)?;

        Paginator::new(
            move |offset, limit| {
                let show_id = show_id.clone();
                async move {
                    self.show_episodes(&show_id, Some(limit), Some(offset))
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
