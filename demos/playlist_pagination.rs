//! Walk a large playlist page by page.

use spotifyrs::{Credentials, PlayableItem, SpotifyClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let client = SpotifyClient::from_credentials(Credentials::from_env()?);

    let playlist_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "37i9dQZF1DXcBWIGoYBM5M".to_string());

    let playlist = client.playlist(&playlist_id).await?;
    println!(
        "{} ({} items)",
        playlist.name,
        playlist.total_items().unwrap_or_default()
    );

    let mut paginator = client.playlist_items_paginator(&playlist_id, 50, 500)?;
    while let Some(page) = paginator.next().await? {
        println!("Fetched {} items at offset {}", page.len(), paginator.offset());
        for item in &page {
            match &item.track {
                Some(PlayableItem::Track(track)) => {
                    println!("   - {} by {}", track.name, track.artist_names())
                }
                Some(PlayableItem::Episode(episode)) => println!("   - episode: {}", episode.name),
                None => println!("   - (unavailable)"),
            }
        }
    }

    println!(
        "\nDone after {} items, paginator {:?}",
        paginator.items().len(),
        paginator.state()
    );

    Ok(())
}
