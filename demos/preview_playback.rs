//! Play the 30 second preview of a track.
//!
//! Many tracks no longer carry a preview, in which case this prints an
//! error.

use spotifyrs::{Credentials, SpotifyClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let client = SpotifyClient::from_credentials(Credentials::from_env()?);

    let argument = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "spotify:track:6rqhFgbbKwnb9MLmUQDhG6".to_string());

    let track = client.track(&argument).await?;
    println!("Playing preview of {} by {}", track.name, track.artist_names());

    let stream = track.preview_stream().await?;

    tokio::task::spawn_blocking(move || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let device_handle = rodio::OutputStreamBuilder::open_default_stream()?;
        let sink = rodio::Sink::connect_new(device_handle.mixer());
        sink.append(rodio::Decoder::new(stream)?);
        sink.play();
        sink.sleep_until_end();
        Ok(())
    })
    .await?
    .map_err(|e| e as Box<dyn std::error::Error>)?;

    Ok(())
}
