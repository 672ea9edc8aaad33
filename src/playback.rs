//! Player control for the current user's devices.
//!
//! These calls need a user token with the `user-read-playback-state` or
//! `user-modify-playback-state` scope, and modifying calls need Premium.

use crate::CursorPaging;
use crate::Error;
use crate::ExternalUrls;
use crate::HasUri;
use crate::id::require_uri;
use crate::PlayableItem;
use crate::Query;
use crate::Route;
use crate::SpotifyClient;
use crate::Track;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{AsRefStr, EnumString};

/// A device that can play music, such as a phone or a speaker.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Device {
    /// Device id, may be absent for restricted devices
    pub id: Option<String>,
    pub name: String,
    /// Device type such as `computer` or `smartphone`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_private_session: bool,
    /// Restricted devices accept no Web API commands
    #[serde(default)]
    pub is_restricted: bool,
    pub volume_percent: Option<u32>,
    #[serde(default)]
    pub supports_volume: bool,
}

#[derive(Debug, Serialize, Deserialize, EnumString, AsRefStr, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RepeatState {
    #[default]
    Off,
    /// Repeat the current track
    Track,
    /// Repeat the current context
    Context,
}

#[derive(Debug, Serialize, Deserialize, EnumString, AsRefStr, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CurrentlyPlayingType {
    Track,
    Episode,
    Ad,
    Unknown,
}

/// The album, artist, playlist or show playback started from.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Context {
    #[serde(rename = "type")]
    pub kind: String,
    pub href: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub uri: String,
}

/// Full state of the user's player.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaybackState {
    pub device: Option<Device>,
    #[serde(default)]
    pub repeat_state: RepeatState,
    #[serde(default)]
    pub shuffle_state: bool,
    pub context: Option<Context>,
    /// Unix timestamp in milliseconds of when the state was last updated
    pub timestamp: i64,
    pub progress_ms: Option<u64>,
    pub is_playing: bool,
    pub item: Option<PlayableItem>,
    pub currently_playing_type: CurrentlyPlayingType,
}

/// What is playing right now, without device or mode information.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CurrentlyPlaying {
    pub context: Option<Context>,
    pub timestamp: i64,
    pub progress_ms: Option<u64>,
    pub is_playing: bool,
    pub item: Option<PlayableItem>,
    pub currently_playing_type: CurrentlyPlayingType,
}

/// A track the user played.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayHistory {
    pub track: Arc<Track>,
    pub played_at: DateTime<Utc>,
    pub context: Option<Context>,
}

/// What to start playing with [`SpotifyClient::start_playback`].
///
/// An empty request resumes the current playback.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct PlaybackRequest {
    /// Album, artist or playlist to play
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_uri: Option<String>,
    /// Tracks or episodes to play
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uris: Vec<String>,
    /// Where in the context to start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<PlaybackOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_ms: Option<u64>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PlaybackOffset {
    Position { position: u32 },
    Uri { uri: String },
}

impl PlaybackRequest {
    pub fn context(context: &impl HasUri) -> Self {
        Self {
            context_uri: Some(context.uri()),
            ..Self::default()
        }
    }

    pub fn items<I: HasUri>(items: &[I]) -> Self {
        Self {
            uris: items.iter().map(HasUri::uri).collect(),
            ..Self::default()
        }
    }

    pub fn with_offset(mut self, offset: PlaybackOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_position_ms(mut self, position_ms: u64) -> Self {
        self.position_ms = Some(position_ms);
        self
    }
}

#[derive(Deserialize)]
struct Devices {
    devices: Vec<Device>,
}

fn device_query(device_id: Option<&str>) -> Query {
    let mut query = Query::new();
    query.push_opt("device_id", device_id);
    query
}

impl SpotifyClient {
    /// Get the player state, or `None` when nothing is playing.
    pub async fn playback_state(&self) -> Result<Option<PlaybackState>, Error> {
        let mut query = Query::new();
        query
            .push("additional_types", "track,episode")
            .push_opt("market", self.get_market());

        let resp: Option<PlaybackState> = self
            .do_request(Route::get("/me/player", "/me/player"), query, None)
            .await?;

        Ok(resp.map(|mut state| {
            state.item = state.item.map(|item| item.link(self.cache()));
            state
        }))
    }

    /// Get the user's available devices.
    pub async fn devices(&self) -> Result<Vec<Device>, Error> {
        let resp: Devices = self
            .do_request(
                Route::get("/me/player/devices", "/me/player/devices"),
                Query::new(),
                None,
            )
            .await?;

        Ok(resp.devices)
    }

    /// Get the item currently playing, or `None` when nothing is playing.
    pub async fn currently_playing(&self) -> Result<Option<CurrentlyPlaying>, Error> {
        let mut query = Query::new();
        query
            .push("additional_types", "track,episode")
            .push_opt("market", self.get_market());

        let resp: Option<CurrentlyPlaying> = self
            .do_request(
                Route::get("/me/player/currently-playing", "/me/player/currently-playing"),
                query,
                None,
            )
            .await?;

        Ok(resp.map(|mut playing| {
            playing.item = playing.item.map(|item| item.link(self.cache()));
            playing
        }))
    }

    /// Move playback to another device, optionally starting it.
    pub async fn transfer_playback(&self, device_id: &str, play: Option<bool>) -> Result<(), Error> {
        let mut body = serde_json::json!({ "device_ids": [device_id] });
        if let Some(play) = play {
            body["play"] = play.into();
        }

        self.do_send(Route::put("/me/player", "/me/player"), Query::new(), Some(body))
            .await
    }

    /// Start new playback or resume the current one.
    pub async fn start_playback(
        &self,
        device_id: Option<&str>,
        request: &PlaybackRequest,
    ) -> Result<(), Error> {
        for uri in request.context_uri.iter().chain(&request.uris) {
            require_uri(uri)?;
        }

        self.do_send(
            Route::put("/me/player/play", "/me/player/play"),
            device_query(device_id),
            Some(serde_json::to_value(request)?),
        )
        .await
    }

    pub async fn pause_playback(&self, device_id: Option<&str>) -> Result<(), Error> {
        self.do_send(
            Route::put("/me/player/pause", "/me/player/pause"),
            device_query(device_id),
            None,
        )
        .await
    }

    pub async fn skip_to_next(&self, device_id: Option<&str>) -> Result<(), Error> {
        self.do_send(
            Route::post("/me/player/next", "/me/player/next"),
            device_query(device_id),
            None,
        )
        .await
    }

    pub async fn skip_to_previous(&self, device_id: Option<&str>) -> Result<(), Error> {
        self.do_send(
            Route::post("/me/player/previous", "/me/player/previous"),
            device_query(device_id),
            None,
        )
        .await
    }

    /// Seek to a position in the current item.
    pub async fn seek(&self, position_ms: u64, device_id: Option<&str>) -> Result<(), Error> {
        let mut query = device_query(device_id);
        query.push("position_ms", position_ms);

        self.do_send(Route::put("/me/player/seek", "/me/player/seek"), query, None)
            .await
    }

    pub async fn set_repeat(&self, state: RepeatState, device_id: Option<&str>) -> Result<(), Error> {
        let mut query = device_query(device_id);
        query.push("state", state.as_ref());

        self.do_send(Route::put("/me/player/repeat", "/me/player/repeat"), query, None)
            .await
    }

    /// Set the volume, from 0 to 100.
    pub async fn set_volume(&self, volume_percent: u8, device_id: Option<&str>) -> Result<(), Error> {
        if volume_percent > 100 {
            return Err(Error::InvalidArgument(format!(
                "volume must be between 0 and 100, got {volume_percent}"
            )));
        }

        let mut query = device_query(device_id);
        query.push("volume_percent", volume_percent);

        self.do_send(Route::put("/me/player/volume", "/me/player/volume"), query, None)
            .await
    }

    pub async fn set_shuffle(&self, state: bool, device_id: Option<&str>) -> Result<(), Error> {
        let mut query = device_query(device_id);
        query.push("state", state);

        self.do_send(Route::put("/me/player/shuffle", "/me/player/shuffle"), query, None)
            .await
    }

    /// Get tracks the user played recently.
    ///
    /// `after` and `before` are Unix timestamps in milliseconds; pass at
    /// most one.
    pub async fn recently_played(
        &self,
        limit: Option<u32>,
        after: Option<i64>,
        before: Option<i64>,
    ) -> Result<CursorPaging<PlayHistory>, Error> {
        if after.is_some() && before.is_some() {
            return Err(Error::InvalidArgument(
                "only one of after and before may be given".to_string(),
            ));
        }

        let mut query = Query::new();
        query
            .push_opt("limit", limit)
            .push_opt("after", after)
            .push_opt("before", before);

        let resp: CursorPaging<PlayHistory> = self
            .do_request(
                Route::get("/me/player/recently-played", "/me/player/recently-played"),
                query,
                None,
            )
            .await?;

        Ok(resp.map_items(|items| {
            items
                .into_iter()
                .map(|mut history| {
                    history.track = self.cache().intern(history.track);
                    history
                })
                .collect()
        }))
    }

    /// Add a track or episode to the end of the playback queue.
    pub async fn add_to_queue(&self, item: &impl HasUri, device_id: Option<&str>) -> Result<(), Error> {
        let mut query = device_query(device_id);
        query.push("uri", require_uri(item)?);

        self.do_send(Route::post("/me/player/queue", "/me/player/queue"), query, None)
            .await
    }
}
