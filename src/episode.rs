use crate::Entity;
use crate::EntityCache;
use crate::EntityKind;
use crate::Error;
use crate::ExternalUrls;
use crate::Image;
use crate::Query;
use crate::ReleaseDatePrecision;
use crate::Restrictions;
use crate::Route;
use crate::Show;
use crate::SpotifyClient;
use crate::deserialize_null_default;
use crate::parse_argument;
use crate::track::preview_stream;
use crate::user::parse_arguments;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stream_download::StreamDownload;
use stream_download::storage::memory::MemoryStorageProvider;

/// A podcast episode.
///
/// Episodes listed on a show page carry no `show`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Episode {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub id: String,
    pub name: String,
    /// Plain text description
    pub description: Option<String>,
    /// URL of a 30 second MP3 preview
    pub audio_preview_url: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub href: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub images: Vec<Image>,
    pub is_externally_hosted: Option<bool>,
    pub is_playable: Option<bool>,
    #[serde(default)]
    pub languages: Vec<String>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<ReleaseDatePrecision>,
    /// Listening progress of the current user, with a user token only
    pub resume_point: Option<ResumePoint>,
    pub restrictions: Option<Restrictions>,
    /// The show the episode belongs to
    pub show: Option<Arc<Show>>,
}

/// How far the current user has listened into an episode.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    pub fully_played: bool,
    pub resume_position_ms: u64,
}

impl Episode {
    /// Get a buffered, seekable stream of the episode's preview clip.
    pub async fn preview_stream(&self) -> Result<StreamDownload<MemoryStorageProvider>, Error> {
        preview_stream(self.audio_preview_url.as_deref()).await
    }
}

impl Entity for Episode {
    const KIND: EntityKind = EntityKind::Episode;

    fn id(&self) -> &str {
        &self.id
    }

    fn link(mut self, cache: &EntityCache) -> Self {
        self.show = self.show.map(|show| cache.intern(show));
        self
    }
}

/// An episode saved in the current user's library.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SavedEpisode {
    pub added_at: chrono::DateTime<chrono::Utc>,
    pub episode: Arc<Episode>,
}

#[derive(Deserialize)]
struct Episodes {
    #[serde(deserialize_with = "crate::deserialize_skip_null")]
    episodes: Vec<Arc<Episode>>,
}

impl SpotifyClient {
    /// Get a podcast episode by id, URI or link.
    pub async fn episode(&self, episode: &str) -> Result<Arc<Episode>, Error> {
        let episode_id = parse_argument(episode, EntityKind::Episode)?;

        let mut query = Query::new();
        query.push_opt("market", self.get_market());

        let resp: Episode = self
            .do_request(
                Route::get("/episodes/{id}", format!("/episodes/{episode_id}")),
                query,
                None,
            )
            .await?;

        Ok(self.cache().insert(resp))
    }

    /// Get several episodes at once (at most 50).
    pub async fn episodes(&self, episodes: &[&str]) -> Result<Vec<Arc<Episode>>, Error> {
        let ids = parse_arguments(episodes, EntityKind::Episode)?;

        let mut query = Query::new();
        query
            .push_list("ids", &ids)
            .push_opt("market", self.get_market());

        let resp: Episodes = self
            .do_request(Route::get("/episodes", "/episodes"), query, None)
            .await?;

        Ok(self.cache().insert_all(resp.episodes))
    }
}
