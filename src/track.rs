use crate::Album;
use crate::Artist;
use crate::Entity;
use crate::EntityCache;
use crate::EntityKind;
use crate::Error;
use crate::ExternalIds;
use crate::ExternalUrls;
use crate::Query;
use crate::Restrictions;
use crate::Route;
use crate::SpotifyClient;
use crate::deserialize_null_default;
use crate::parse_argument;
use crate::user::parse_arguments;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use stream_download::storage::memory::MemoryStorageProvider;
use stream_download::{Settings, StreamDownload};

/// Represents a track from the Spotify catalog.
///
/// Tracks listed on an album page are simplified and have no `album`,
/// `popularity` or `external_ids`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Track {
    /// Unique track identifier, empty for local files
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub id: String,
    /// Track title
    pub name: String,
    /// Artists who performed the track
    #[serde(default)]
    pub artists: Vec<Arc<Artist>>,
    /// Album the track appears on
    pub album: Option<Arc<Album>>,
    /// Duration of the track in milliseconds
    pub duration_ms: u64,
    #[serde(default)]
    pub disc_number: u32,
    /// Track number within its disc
    #[serde(default)]
    pub track_number: u32,
    /// Whether the track contains explicit content
    #[serde(default)]
    pub explicit: bool,
    /// Whether the track is a local file rather than a catalog track
    #[serde(default)]
    pub is_local: bool,
    /// Set when a market was given; false if the track cannot be played there
    pub is_playable: Option<bool>,
    /// The originally requested track when the market relinked it
    pub linked_from: Option<LinkedTrack>,
    pub restrictions: Option<Restrictions>,
    #[serde(default)]
    pub available_markets: Vec<String>,
    /// URL of a 30 second MP3 preview
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub external_ids: Option<ExternalIds>,
    /// Web API endpoint for the full track
    pub href: Option<String>,
    /// Popularity score between 0 and 100
    pub popularity: Option<u32>,
}

/// Reference to the track that was requested before relinking.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LinkedTrack {
    pub id: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub href: Option<String>,
}

impl Track {
    /// Names of the track's artists joined with `, `.
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Get a buffered, seekable stream of the track's 30 second preview.
    ///
    /// While this function is async, the returned stream is sync.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(track: &spotifyrs::Track) -> Result<(), spotifyrs::Error> {
    /// let stream = track.preview_stream().await?;
    ///
    /// tokio::task::spawn_blocking(move || {
    ///     let device_handle = rodio::OutputStreamBuilder::open_default_stream().unwrap();
    ///     let sink = rodio::Sink::connect_new(device_handle.mixer());
    ///     sink.append(rodio::Decoder::new(stream).unwrap());
    ///     sink.play();
    ///     sink.sleep_until_end();
    /// })
    /// .await
    /// .unwrap();
    /// # Ok(())
    /// # }
    /// ```
    pub async fn preview_stream(&self) -> Result<StreamDownload<MemoryStorageProvider>, Error> {
        preview_stream(self.preview_url.as_deref()).await
    }
}

impl Entity for Track {
    const KIND: EntityKind = EntityKind::Track;

    fn id(&self) -> &str {
        &self.id
    }

    fn link(mut self, cache: &EntityCache) -> Self {
        self.album = self.album.map(|album| cache.intern(album));
        self.artists = cache.intern_all(self.artists);
        self
    }
}

pub(crate) async fn preview_stream(
    preview_url: Option<&str>,
) -> Result<StreamDownload<MemoryStorageProvider>, Error> {
    let url: reqwest::Url = match preview_url {
        Some(url) => url.parse()?,
        None => return Err(Error::NoPreviewUrl),
    };

    let reader = match StreamDownload::new_http(url, MemoryStorageProvider, Settings::default()).await {
        Ok(reader) => reader,
        Err(e) => {
            return Err(Error::StreamInitialization(e.to_string()));
        }
    };

    Ok(reader)
}

/// A track saved in the current user's library.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SavedTrack {
    /// When the track was saved
    pub added_at: chrono::DateTime<chrono::Utc>,
    pub track: Arc<Track>,
}

/// Audio features computed for a track.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AudioFeatures {
    /// Track id these features belong to
    pub id: String,
    /// Confidence from 0.0 to 1.0 that the track is acoustic
    pub acousticness: f32,
    pub danceability: f32,
    pub energy: f32,
    pub instrumentalness: f32,
    /// Estimated key as pitch class notation, -1 when not detected
    pub key: i32,
    pub liveness: f32,
    /// Overall loudness in decibels
    pub loudness: f32,
    /// 1 for major, 0 for minor
    pub mode: i32,
    pub speechiness: f32,
    /// Estimated tempo in beats per minute
    pub tempo: f32,
    /// Estimated beats per bar
    pub time_signature: i32,
    /// Musical positiveness from 0.0 to 1.0
    pub valence: f32,
    pub duration_ms: u64,
    pub analysis_url: Option<String>,
}

#[derive(Deserialize)]
struct Tracks {
    #[serde(deserialize_with = "crate::deserialize_skip_null")]
    tracks: Vec<Arc<Track>>,
}

#[derive(Deserialize)]
struct AudioFeaturesList {
    audio_features: Vec<Option<AudioFeatures>>,
}

impl SpotifyClient {
    /// Get track information by id, URI or link.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(client: spotifyrs::SpotifyClient) -> Result<(), spotifyrs::Error> {
    /// let track = client.track("spotify:track:6rqhFgbbKwnb9MLmUQDhG6").await?;
    /// println!("Track: {} by {}", track.name, track.artist_names());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn track(&self, track: &str) -> Result<Arc<Track>, Error> {
        let track_id = parse_argument(track, EntityKind::Track)?;

        let mut query = Query::new();
        query.push_opt("market", self.get_market());

        let resp: Track = self
            .do_request(
                Route::get("/tracks/{id}", format!("/tracks/{track_id}")),
                query,
                None,
            )
            .await?;

        Ok(self.cache().insert(resp))
    }

    /// Get several tracks at once (at most 50). Unknown ids are skipped.
    pub async fn tracks(&self, tracks: &[&str]) -> Result<Vec<Arc<Track>>, Error> {
        let ids = parse_arguments(tracks, EntityKind::Track)?;

        let mut query = Query::new();
        query
            .push_list("ids", &ids)
            .push_opt("market", self.get_market());

        let resp: Tracks = self
            .do_request(Route::get("/tracks", "/tracks"), query, None)
            .await?;

        Ok(self.cache().insert_all(resp.tracks))
    }

    /// Get the audio features of a track.
    pub async fn track_audio_features(&self, track: &str) -> Result<AudioFeatures, Error> {
        let track_id = parse_argument(track, EntityKind::Track)?;

        self.do_request(
            Route::get("/audio-features/{id}", format!("/audio-features/{track_id}")),
            Query::new(),
            None,
        )
        .await
    }

    /// Get audio features for several tracks at once (at most 100).
    ///
    /// The result lines up with `tracks`; a `None` entry means no features
    /// exist for that track.
    pub async fn tracks_audio_features(
        &self,
        tracks: &[&str],
    ) -> Result<Vec<Option<AudioFeatures>>, Error> {
        let ids = parse_arguments(tracks, EntityKind::Track)?;

        let mut query = Query::new();
        query.push_list("ids", &ids);

        let resp: AudioFeaturesList = self
            .do_request(Route::get("/audio-features", "/audio-features"), query, None)
            .await?;

        Ok(resp.audio_features)
    }

    /// Get the low level audio analysis of a track as raw JSON.
    pub async fn track_audio_analysis(&self, track: &str) -> Result<Value, Error> {
        let track_id = parse_argument(track, EntityKind::Track)?;

        self.do_request(
            Route::get("/audio-analysis/{id}", format!("/audio-analysis/{track_id}")),
            Query::new(),
            None,
        )
        .await
    }
}
