//! Authentication example demonstrating the OAuth2 authorization code flow.
//!
//! This example shows how to:
//! - Build the authorization URL for a set of scopes
//! - Read the code the user was redirected with
//! - Make calls on behalf of the user
//!
//! Register `http://127.0.0.1:8888/callback` as a redirect URI of your app.

use async_trait::async_trait;
use spotifyrs::{AuthorizationCodeSource, Credentials, Error, Scope, SpotifyClient};
use std::io::{self, Write};
use url::Url;

const REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

/// Asks the user to open the authorization URL and paste the URL they were
/// redirected to.
struct Terminal;

#[async_trait]
impl AuthorizationCodeSource for Terminal {
    async fn authorization_code(&self, authorize_url: &Url) -> Result<String, Error> {
        println!("Please complete the following steps:");
        println!("1. Visit: {}", authorize_url);
        println!("2. Paste the URL you were redirected to:");

        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        let redirected = Url::parse(input.trim())?;
        redirected
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, code)| code.into_owned())
            .ok_or_else(|| Error::InvalidArgument("redirect URL has no code".to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let client = SpotifyClient::from_credentials(Credentials::from_env()?)
        .with_token_refresh_callback(|token| {
            println!("Token refreshed, expires at {:?}", token.expires_at);
            // In a real application, you would save the token to persistent storage
        });

    let token = client
        .authorize_with(
            &Terminal,
            REDIRECT_URI,
            &[Scope::UserReadPrivate, Scope::UserLibraryRead],
        )
        .await?;

    println!("\nAuthentication successful!");
    println!("   Scopes: {}", token.scope.as_deref().unwrap_or("none"));
    println!("   Expires at: {:?}", token.expires_at);

    let me = client.current_user().await?;
    println!(
        "\nLogged in as {} ({})",
        me.display_name.as_deref().unwrap_or(&me.id),
        me.country.as_deref().unwrap_or("unknown country")
    );

    match client.saved_tracks(Some(5), None).await {
        Ok(saved) => {
            println!("Found {} saved tracks", saved.total);
            for item in &saved.items {
                println!("   - {} by {}", item.track.name, item.track.artist_names());
            }
        }
        Err(e) => {
            println!("Failed to get saved tracks: {}", e);
        }
    }

    // The token serializes with serde, so it can be stored and passed to
    // `with_token` on the next run.
    println!("\nToken JSON: {}", serde_json::to_string(&*token)?);

    Ok(())
}
