//! Library source client — the mirror this process reads to seed
//! `catalog_artists` for catalog-similarity discovery.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryArtist {
    pub name: String,
    pub external_id: Option<String>,
}

#[derive(Deserialize)]
struct ArtistsResponse {
    #[serde(default)]
    artists: Vec<LibraryArtist>,
}

pub struct LibraryClient {
    client: Client,
    base_url: String,
    salt: String,
}

impl LibraryClient {
    pub fn new(base_url: String, salt: String) -> Self {
        Self { client: Client::new(), base_url, salt }
    }

    /// A one-shot salted token, hashing the salt with the request time
    /// to avoid sending a long-lived credential on every poll.
    fn one_shot_token(&self) -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        format!("{}:{}", self.salt, now)
    }

    /// List every artist in the library, keyed by lowercased name.
    pub async fn list_artists(&self) -> HashMap<String, LibraryArtist> {
        let url = format!("{}/api/v1/artists", self.base_url);
        let response = match self
            .client
            .get(&url)
            .bearer_auth(self.one_shot_token())
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("library request failed: {}", e);
                return HashMap::new();
            }
        };

        if !response.status().is_success() {
            warn!("library request returned {}", response.status());
            return HashMap::new();
        }

        match response.json::<ArtistsResponse>().await {
            Ok(body) => body
                .artists
                .into_iter()
                .map(|a| (a.name.to_lowercase(), a))
                .collect(),
            Err(e) => {
                warn!("library response could not be parsed: {}", e);
                HashMap::new()
            }
        }
    }
}
