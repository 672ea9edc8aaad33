use crate::{Error, SpotifyClient};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cover art or a profile picture hosted on Spotify's CDN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    /// Height in pixels, absent for user uploaded images
    pub height: Option<u32>,
    /// Width in pixels, absent for user uploaded images
    pub width: Option<u32>,
}

impl Image {
    /// Download the image bytes.
    pub async fn read(&self, client: &SpotifyClient) -> Result<Vec<u8>, Error> {
        client.pipeline().fetch_bytes(&self.url).await
    }

    /// Download the image and write it to `path`, returning the number of
    /// bytes written.
    pub async fn save(&self, client: &SpotifyClient, path: impl AsRef<Path>) -> Result<usize, Error> {
        let bytes = self.read(client).await?;
        tokio::fs::write(path, &bytes).await?;
        Ok(bytes.len())
    }
}

/// Pick the largest image of a list, by pixel area.
pub fn largest_image(images: &[Image]) -> Option<&Image> {
    images
        .iter()
        .max_by_key(|image| u64::from(image.width.unwrap_or(0)) * u64::from(image.height.unwrap_or(0)))
}
