//! Basic search example demonstrating how to search the Spotify catalog.
//!
//! This example shows how to:
//! - Create a SpotifyClient from environment credentials
//! - Search for artists, albums and tracks
//! - Display search results
//!
//! Run with `SPOTIFY_CLIENT_ID` and `SPOTIFY_CLIENT_SECRET` set.

use spotifyrs::{Credentials, SearchType, SpotifyClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let client = SpotifyClient::from_credentials(Credentials::from_env()?)
        .with_market("US".to_string());

    let query = std::env::args().nth(1).unwrap_or_else(|| "Radiohead".to_string());

    println!("Searching for: {}", query);
    let results = client
        .search(
            &query,
            &[SearchType::Artist, SearchType::Album, SearchType::Track],
            Some(5),
            None,
            None,
        )
        .await?;

    if let Some(artists) = &results.artists {
        println!("\nArtists ({} total):", artists.total);
        for artist in &artists.items {
            println!(
                "  - {} (ID: {}, popularity: {})",
                artist.name,
                artist.id,
                artist.popularity.unwrap_or_default()
            );
        }
    }

    if let Some(albums) = &results.albums {
        println!("\nAlbums ({} total):", albums.total);
        for album in &albums.items {
            println!(
                "  - {} by {} ({})",
                album.name,
                album
                    .artists
                    .first()
                    .map(|a| a.name.as_str())
                    .unwrap_or("Unknown"),
                album.release_date.as_deref().unwrap_or("unknown date")
            );
        }
    }

    if let Some(tracks) = &results.tracks {
        println!("\nTracks ({} total):", tracks.total);
        for track in &tracks.items {
            println!("  - {} by {} (ID: {})", track.name, track.artist_names(), track.id);
        }
    }

    Ok(())
}
