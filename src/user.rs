use crate::Artist;
use crate::CursorPaging;
use crate::Entity;
use crate::EntityCache;
use crate::EntityKind;
use crate::Error;
use crate::ExternalUrls;
use crate::Followers;
use crate::Image;
use crate::Paging;
use crate::Query;
use crate::Route;
use crate::SpotifyClient;
use crate::Track;
use crate::deserialize_null_default;
use crate::parse_argument;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{AsRefStr, EnumString};

/// A Spotify user profile.
///
/// Profiles embedded in other objects (playlist owners, `added_by`) only
/// carry the id and display name. The private fields are only present on
/// the profile of the authenticated user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub id: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub href: Option<String>,
    pub followers: Option<Followers>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub images: Vec<Image>,

    /// Country of the account, current user only
    pub country: Option<String>,
    /// Email address, current user only with the `user-read-email` scope
    pub email: Option<String>,
    /// Subscription level (`premium`, `free`), current user only
    pub product: Option<String>,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Time frame over which top items are computed.
#[derive(Debug, Serialize, Deserialize, EnumString, AsRefStr, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeRange {
    /// Roughly the last year
    LongTerm,
    /// Roughly the last 6 months
    #[default]
    MediumTerm,
    /// Roughly the last 4 weeks
    ShortTerm,
}

#[derive(Deserialize)]
struct FollowedArtists {
    artists: CursorPaging<Arc<Artist>>,
}

impl SpotifyClient {
    /// Get the profile of the authenticated user.
    ///
    /// Requires a user token obtained through [`SpotifyClient::authorize`].
    pub async fn current_user(&self) -> Result<Arc<User>, Error> {
        let resp: User = self
            .do_request(Route::get("/me", "/me"), Query::new(), None)
            .await?;

        Ok(self.cache().insert(resp))
    }

    /// Get the public profile of a user.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(client: spotifyrs::SpotifyClient) -> Result<(), spotifyrs::Error> {
    /// let user = client.user("spotify:user:smedjan").await?;
    /// println!("{:?}", user.display_name);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn user(&self, user: &str) -> Result<Arc<User>, Error> {
        let user_id = parse_argument(user, EntityKind::User)?;

        let resp: User = self
            .do_request(
                Route::get("/users/{id}", format!("/users/{user_id}")),
                Query::new(),
                None,
            )
            .await?;

        Ok(self.cache().insert(resp))
    }

    /// Get the current user's most played tracks.
    pub async fn current_user_top_tracks(
        &self,
        time_range: Option<TimeRange>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<Arc<Track>>, Error> {
        let query = top_items_query(time_range, limit, offset);

        let resp: Paging<Arc<Track>> = self
            .do_request(Route::get("/me/top/{type}", "/me/top/tracks"), query, None)
            .await?;

        Ok(self.store_page(resp))
    }

    /// Get the current user's most played artists.
    pub async fn current_user_top_artists(
        &self,
        time_range: Option<TimeRange>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Paging<Arc<Artist>>, Error> {
        let query = top_items_query(time_range, limit, offset);

        let resp: Paging<Arc<Artist>> = self
            .do_request(Route::get("/me/top/{type}", "/me/top/artists"), query, None)
            .await?;

        Ok(self.store_page(resp))
    }

    /// Get the artists the current user follows.
    ///
    /// Pass the previous page's [`CursorPaging::after`] to continue.
    pub async fn followed_artists(
        &self,
        after: Option<&str>,
        limit: Option<u32>,
    ) -> Result<CursorPaging<Arc<Artist>>, Error> {
        let mut query = Query::new();
        query
            .push("type", "artist")
            .push_opt("after", after)
            .push_opt("limit", limit);

        let resp: FollowedArtists = self
            .do_request(Route::get("/me/following", "/me/following"), query, None)
            .await?;

        let cache: &EntityCache = self.cache();
        Ok(resp.artists.map_items(|items| cache.insert_all(items)))
    }

    pub async fn follow_artists(&self, artists: &[&str]) -> Result<(), Error> {
        self.change_following(EntityKind::Artist, artists, true).await
    }

    pub async fn unfollow_artists(&self, artists: &[&str]) -> Result<(), Error> {
        self.change_following(EntityKind::Artist, artists, false).await
    }

    pub async fn follow_users(&self, users: &[&str]) -> Result<(), Error> {
        self.change_following(EntityKind::User, users, true).await
    }

    pub async fn unfollow_users(&self, users: &[&str]) -> Result<(), Error> {
        self.change_following(EntityKind::User, users, false).await
    }

    /// Check whether the current user follows each of `artists`.
    pub async fn check_following_artists(&self, artists: &[&str]) -> Result<Vec<bool>, Error> {
        self.check_following(EntityKind::Artist, artists).await
    }

    /// Check whether the current user follows each of `users`.
    pub async fn check_following_users(&self, users: &[&str]) -> Result<Vec<bool>, Error> {
        self.check_following(EntityKind::User, users).await
    }

    async fn change_following(
        &self,
        kind: EntityKind,
        ids: &[&str],
        follow: bool,
    ) -> Result<(), Error> {
        let ids = parse_arguments(ids, kind)?;

        let mut query = Query::new();
        query.push("type", kind);

        let route = if follow {
            Route::put("/me/following", "/me/following")
        } else {
            Route::delete("/me/following", "/me/following")
        };

        self.do_send(route, query, Some(serde_json::json!({ "ids": ids })))
            .await
    }

    async fn check_following(&self, kind: EntityKind, ids: &[&str]) -> Result<Vec<bool>, Error> {
        let ids = parse_arguments(ids, kind)?;

        let mut query = Query::new();
        query.push("type", kind).push_list("ids", &ids);

        self.do_request(
            Route::get("/me/following/contains", "/me/following/contains"),
            query,
            None,
        )
        .await
    }
}

fn top_items_query(time_range: Option<TimeRange>, limit: Option<u32>, offset: Option<u32>) -> Query {
    let mut query = Query::new();
    query
        .push_opt("time_range", time_range.map(|range| range.as_ref().to_string()))
        .push_opt("limit", limit)
        .push_opt("offset", offset);
    query
}

/// Parse every argument as an id of `kind`.
pub(crate) fn parse_arguments(arguments: &[&str], kind: EntityKind) -> Result<Vec<String>, Error> {
    arguments
        .iter()
        .map(|argument| parse_argument(argument, kind))
        .collect()
}
