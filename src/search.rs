use crate::Album;
use crate::Artist;
use crate::Episode;
use crate::Error;
use crate::Paging;
use crate::Playlist;
use crate::Query;
use crate::Route;
use crate::Show;
use crate::SpotifyClient;
use crate::Track;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{AsRefStr, EnumString};

/// Kinds of catalog items a search can return.
#[derive(Debug, Serialize, Deserialize, EnumString, AsRefStr, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchType {
    Album,
    Artist,
    Playlist,
    Track,
    Show,
    Episode,
}

impl SearchType {
    /// Every searchable kind.
    pub fn all() -> [SearchType; 6] {
        [
            SearchType::Album,
            SearchType::Artist,
            SearchType::Playlist,
            SearchType::Track,
            SearchType::Show,
            SearchType::Episode,
        ]
    }
}

/// Results of a search, one page per requested [`SearchType`].
///
/// Kinds that were not requested are `None`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SearchResults {
    pub tracks: Option<Paging<Arc<Track>>>,
    pub albums: Option<Paging<Arc<Album>>>,
    pub artists: Option<Paging<Arc<Artist>>>,
    pub playlists: Option<Paging<Arc<Playlist>>>,
    pub shows: Option<Paging<Arc<Show>>>,
    pub episodes: Option<Paging<Arc<Episode>>>,
}

impl SpotifyClient {
    /// Search the catalog.
    ///
    /// With no `types` every kind is searched. The market falls back to the
    /// client's market.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use spotifyrs::{SearchType, SpotifyClient};
    ///
    /// # async fn example(client: SpotifyClient) -> Result<(), spotifyrs::Error> {
    /// let results = client
    ///     .search("Daft Punk", &[SearchType::Artist, SearchType::Track], Some(10), None, None)
    ///     .await?;
    ///
    /// if let Some(tracks) = results.tracks {
    ///     for track in tracks.items {
    ///         println!("{} by {}", track.name, track.artist_names());
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search(
        &self,
        query: &str,
        types: &[SearchType],
        limit: Option<u32>,
        offset: Option<u32>,
        market: Option<&str>,
    ) -> Result<SearchResults, Error> {
        if query.trim().is_empty() {
            return Err(Error::InvalidArgument("search query is empty".to_string()));
        }

        let types: Vec<SearchType> = if types.is_empty() {
            SearchType::all().to_vec()
        } else {
            types.to_vec()
        };

        let mut params = Query::new();
        params
            .push("q", query)
            .push_list("type", &types)
            .push_opt("market", self.market_or_default(market))
            .push_opt("limit", limit)
            .push_opt("offset", offset);

        let resp: SearchResults = self
            .do_request(Route::get("/search", "/search"), params, None)
            .await?;

        Ok(SearchResults {
            tracks: resp.tracks.map(|page| self.store_page(page)),
            albums: resp.albums.map(|page| self.store_page(page)),
            artists: resp.artists.map(|page| self.store_page(page)),
            playlists: resp.playlists.map(|page| self.store_page(page)),
            shows: resp.shows.map(|page| self.store_page(page)),
            episodes: resp.episodes.map(|page| self.store_page(page)),
        })
    }
}
