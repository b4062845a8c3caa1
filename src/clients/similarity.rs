//! Similar-artists client — a Last.fm-style `artist.getsimilar`
//! adapter, async end to end. Failures are logged and returned as an
//! empty result rather than propagated, so one flaky call doesn't take
//! down the whole discovery run.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SimilarArtist {
    pub name: String,
    pub canonical_id: Option<String>,
    pub score: f64,
}

#[derive(Deserialize)]
struct SimilarArtistsResponse {
    similarartists: Option<SimilarArtistsContainer>,
}

#[derive(Deserialize)]
struct SimilarArtistsContainer {
    artist: Option<Vec<RawArtist>>,
}

#[derive(Deserialize)]
struct RawArtist {
    name: Option<String>,
    mbid: Option<String>,
    #[serde(rename = "match")]
    match_score: Option<String>,
}

pub struct SimilarityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SimilarityClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self { client: Client::new(), base_url, api_key }
    }

    pub async fn get_similar(&self, artist_name: &str, limit: usize) -> Vec<SimilarArtist> {
        let url = format!(
            "{}?method=artist.getsimilar&artist={}&api_key={}&format=json&limit={}",
            self.base_url,
            urlencoding::encode(artist_name),
            self.api_key,
            limit
        );

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("similarity request failed for {}: {}", artist_name, e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            debug!("similarity request for {} returned {}", artist_name, response.status());
            return Vec::new();
        }

        let body: SimilarArtistsResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                debug!("similarity response for {} could not be parsed: {}", artist_name, e);
                return Vec::new();
            }
        };

        body.similarartists
            .and_then(|sa| sa.artist)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| {
                let name = a.name?;
                let score = a.match_score.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0.0);
                let canonical_id = a.mbid.filter(|m| !m.is_empty());
                Some(SimilarArtist { name, canonical_id, score })
            })
            .collect()
    }
}
