use crate::Album;
use crate::EntityKind;
use crate::Error;
use crate::Image;
use crate::Paging;
use crate::Playlist;
use crate::Query;
use crate::Route;
use crate::SpotifyClient;
use crate::Track;
use crate::parse_argument;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumString};

/// Largest number of seeds a recommendations request may combine.
pub const MAX_RECOMMENDATION_SEEDS: usize = 5;

/// A browse category, such as "Mood" or "Hip-Hop".
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub href: Option<String>,
    #[serde(default, rename = "icons")]
    pub images: Vec<Image>,
}

/// Editorial playlists with the message shown above them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FeaturedPlaylists {
    pub message: Option<String>,
    pub playlists: Paging<Arc<Playlist>>,
}

/// Track attributes recommendations can be tuned on.
#[derive(Debug, Serialize, Deserialize, EnumString, AsRefStr, Display, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TunableAttribute {
    Acousticness,
    Danceability,
    DurationMs,
    Energy,
    Instrumentalness,
    Key,
    Liveness,
    Loudness,
    Mode,
    Popularity,
    Speechiness,
    Tempo,
    TimeSignature,
    Valence,
}

/// How a tunable attribute constrains recommendations.
#[derive(Debug, EnumString, AsRefStr, Display, PartialEq, Eq, Hash, Clone, Copy)]
#[strum(serialize_all = "snake_case")]
pub enum AttributeBound {
    /// Hard floor
    Min,
    /// Hard ceiling
    Max,
    /// Preferred value
    Target,
}

/// Parameters of a recommendations request.
///
/// At least one and at most five seeds (artists, genres and tracks combined)
/// are required.
///
/// # Example
///
/// ```
/// use spotifyrs::{AttributeBound, RecommendationsRequest, TunableAttribute};
///
/// let request = RecommendationsRequest::new()
///     .with_seed_genres(&["house"])
///     .with_seed_tracks(&["spotify:track:0c6xIDDpzE81m2q797ordA"])
///     .with_attribute(AttributeBound::Min, TunableAttribute::Energy, 0.6)
///     .with_limit(10);
/// assert_eq!(request.seed_count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationsRequest {
    seed_artists: Vec<String>,
    seed_genres: Vec<String>,
    seed_tracks: Vec<String>,
    attributes: Vec<(AttributeBound, TunableAttribute, f64)>,
    limit: Option<u32>,
    market: Option<String>,
}

impl RecommendationsRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed artists, as ids, URIs or links.
    pub fn with_seed_artists(mut self, artists: &[&str]) -> Self {
        self.seed_artists
            .extend(artists.iter().map(|artist| artist.to_string()));
        self
    }

    /// Seed genres, from [`SpotifyClient::recommendation_genres`].
    pub fn with_seed_genres(mut self, genres: &[&str]) -> Self {
        self.seed_genres
            .extend(genres.iter().map(|genre| genre.to_string()));
        self
    }

    /// Seed tracks, as ids, URIs or links.
    pub fn with_seed_tracks(mut self, tracks: &[&str]) -> Self {
        self.seed_tracks
            .extend(tracks.iter().map(|track| track.to_string()));
        self
    }

    pub fn with_attribute(mut self, bound: AttributeBound, attribute: TunableAttribute, value: f64) -> Self {
        self.attributes.push((bound, attribute, value));
        self
    }

    /// Number of tracks to return, 1 to 100.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_market(mut self, market: String) -> Self {
        self.market = Some(market);
        self
    }

    pub fn seed_count(&self) -> usize {
        self.seed_artists.len() + self.seed_genres.len() + self.seed_tracks.len()
    }

    fn to_query(&self, default_market: Option<String>) -> Result<Query, Error> {
        let seeds = self.seed_count();
        if seeds == 0 || seeds > MAX_RECOMMENDATION_SEEDS {
            return Err(Error::InvalidArgument(format!(
                "recommendations need between 1 and {MAX_RECOMMENDATION_SEEDS} seeds, got {seeds}"
            )));
        }

        let artists = self
            .seed_artists
            .iter()
            .map(|artist| parse_argument(artist, EntityKind::Artist))
            .collect::<Result<Vec<_>, _>>()?;
        let tracks = self
            .seed_tracks
            .iter()
            .map(|track| parse_argument(track, EntityKind::Track))
            .collect::<Result<Vec<_>, _>>()?;

        let mut query = Query::new();
        query
            .push_list("seed_artists", &artists)
            .push_list("seed_genres", &self.seed_genres)
            .push_list("seed_tracks", &tracks)
            .push_opt("limit", self.limit)
            .push_opt("market", self.market.clone().or(default_market));

        for (bound, attribute, value) in &self.attributes {
            query.push(&format!("{bound}_{attribute}"), value);
        }

        Ok(query)
    }
}

/// A seed a recommendations response was built from.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSeed {
    pub id: String,
    /// `artist`, `track` or `genre`
    #[serde(rename = "type")]
    pub kind: String,
    pub href: Option<String>,
    pub initial_pool_size: u32,
    pub after_filtering_size: u32,
    pub after_relinking_size: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Recommendations {
    pub seeds: Vec<RecommendationSeed>,
    #[serde(deserialize_with = "crate::deserialize_skip_null")]
    pub tracks: Vec<Arc<Track>>,
}

#[derive(Deserialize)]
struct NewReleases {
    albums: Paging<Arc<Album>>,
}

#[derive(Deserialize)]
struct Categories {
    categories: Paging<Category>,
}

#[derive(Deserialize)]
struct CategoryPlaylists {
    playlists: Paging<Arc<Playlist>>,
}

#[derive(Deserialize)]
struct Genres {
    genres: Vec<String>,
}

#[derive(Deserialize)]
struct Markets {
    markets: Vec<String>,
}

impl SpotifyClient {
    /// Get a page of newly released albums.
    pub async fn new_releases(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<Arc<Album>>, Error> {
        let mut query = Query::new();
        query
            .push_opt("country", self.get_market())
            .push_opt("limit", limit)
            .push_opt("offset", offset);

        let resp: NewReleases = self
            .do_request(
                Route::get("/browse/new-releases", "/browse/new-releases"),
                query,
                None,
            )
            .await?;

        Ok(self.store_page(resp.albums))
    }

    /// Get a page of editorial playlists.
    pub async fn featured_playlists(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<FeaturedPlaylists, Error> {
        let mut query = self.browse_query();
        query.push_opt("limit", limit).push_opt("offset", offset);

        let resp: FeaturedPlaylists = self
            .do_request(
                Route::get("/browse/featured-playlists", "/browse/featured-playlists"),
                query,
                None,
            )
            .await?;

        Ok(FeaturedPlaylists {
            message: resp.message,
            playlists: self.store_page(resp.playlists),
        })
    }

    /// Get a page of browse categories.
    pub async fn categories(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<Category>, Error> {
        let mut query = self.browse_query();
        query.push_opt("limit", limit).push_opt("offset", offset);

        let resp: Categories = self
            .do_request(
                Route::get("/browse/categories", "/browse/categories"),
                query,
                None,
            )
            .await?;

        Ok(resp.categories)
    }

    pub async fn category(&self, category_id: &str) -> Result<Category, Error> {
        self.do_request(
            Route::get(
                "/browse/categories/{id}",
                format!("/browse/categories/{category_id}"),
            ),
            self.browse_query(),
            None,
        )
        .await
    }

    /// Get a page of playlists in a browse category.
    pub async fn category_playlists(
        &self,
        category_id: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<Arc<Playlist>>, Error> {
        let mut query = Query::new();
        query
            .push_opt("country", self.get_market())
            .push_opt("limit", limit)
            .push_opt("offset", offset);

        let resp: CategoryPlaylists = self
            .do_request(
                Route::get(
                    "/browse/categories/{id}/playlists",
                    format!("/browse/categories/{category_id}/playlists"),
                ),
                query,
                None,
            )
            .await?;

        Ok(self.store_page(resp.playlists))
    }

    /// Get track recommendations built from seeds and tunable attributes.
    pub async fn recommendations(
        &self,
        request: &RecommendationsRequest,
    ) -> Result<Recommendations, Error> {
        let query = request.to_query(self.get_market())?;

        let resp: Recommendations = self
            .do_request(Route::get("/recommendations", "/recommendations"), query, None)
            .await?;

        Ok(Recommendations {
            seeds: resp.seeds,
            tracks: self.cache().insert_all(resp.tracks),
        })
    }

    /// Genres usable as recommendation seeds.
    pub async fn recommendation_genres(&self) -> Result<Vec<String>, Error> {
        let resp: Genres = self
            .do_request(
                Route::get(
                    "/recommendations/available-genre-seeds",
                    "/recommendations/available-genre-seeds",
                ),
                Query::new(),
                None,
            )
            .await?;

        Ok(resp.genres)
    }

    /// Markets where Spotify is available.
    pub async fn available_markets(&self) -> Result<Vec<String>, Error> {
        let resp: Markets = self
            .do_request(Route::get("/markets", "/markets"), Query::new(), None)
            .await?;

        Ok(resp.markets)
    }

    fn browse_query(&self) -> Query {
        let mut query = Query::new();
        query
            .push_opt("country", self.get_market())
            .push_opt("locale", self.get_locale());
        query
    }
}
