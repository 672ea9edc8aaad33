//! Look up a track by id, URI or link and explore what comes with it.
//!
//! The album and artists embedded in the track land in the client's entity
//! cache, so fetching the full album afterwards replaces the simplified copy.

use spotifyrs::{Credentials, EntityKind, SpotifyClient, largest_image};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let client = SpotifyClient::from_credentials(Credentials::from_env()?);

    let argument = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://open.spotify.com/track/6rqhFgbbKwnb9MLmUQDhG6".to_string());

    let track = client.track(&argument).await?;
    let minutes = track.duration_ms / 60_000;
    let seconds = (track.duration_ms / 1000) % 60;

    println!("{} by {}", track.name, track.artist_names());
    println!("   Duration: {}:{:02}", minutes, seconds);
    println!("   Explicit: {}", track.explicit);
    println!("   URI: {}", spotifyrs::HasUri::uri(&*track));

    if let Some(album) = &track.album {
        println!("\nAlbum: {} ({:?})", album.name, album.release_year());
        if let Some(cover) = largest_image(&album.images) {
            println!("   Cover: {}", cover.url);
        }

        let album = client.album(&album.id).await?;
        println!("   Label: {}", album.label.as_deref().unwrap_or("unknown"));
        if let Some(tracks) = &album.tracks {
            for (i, album_track) in tracks.items.iter().enumerate() {
                println!("   {:2}. {}", i + 1, album_track.name);
            }
        }
    }

    for artist in &track.artists {
        let artist = client.artist(&artist.id).await?;
        println!("\nArtist: {}", artist.name);
        if !artist.genres.is_empty() {
            println!("   Genres: {}", artist.genres.join(", "));
        }

        let top_tracks = client.artist_top_tracks(&artist.id).await?;
        println!("   Top tracks:");
        for top in top_tracks.iter().take(5) {
            println!("   - {}", top.name);
        }
    }

    println!(
        "\nCached: {} tracks, {} albums, {} artists",
        client.cache().len(EntityKind::Track),
        client.cache().len(EntityKind::Album),
        client.cache().len(EntityKind::Artist)
    );

    Ok(())
}
