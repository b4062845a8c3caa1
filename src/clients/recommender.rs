//! Recommendation source client, modeled as a ListenBrainz-style
//! recommendation feed: async `reqwest` calls that degrade to an empty
//! result rather than propagating an error on failure.

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

/// One recommended recording, as surfaced to `RecommenderFetch`.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub canonical_id: String,
    pub score: Option<f64>,
}

#[derive(Deserialize)]
struct RecommendationsResponse {
    #[serde(default)]
    recordings: Vec<RecommendedRecording>,
}

#[derive(Deserialize)]
struct RecommendedRecording {
    recording_mbid: String,
    score: Option<f64>,
}

pub struct RecommenderClient {
    client: Client,
    base_url: String,
}

impl RecommenderClient {
    pub fn new(base_url: String) -> Self {
        Self { client: Client::new(), base_url }
    }

    /// Fetch up to `count` recommendations for `user`. A 204 means "not
    /// enough listening history yet" and is not an error — callers get
    /// an empty list either way.
    pub async fn fetch_recommendations(
        &self,
        user: &str,
        token: &str,
        count: usize,
    ) -> Vec<Recommendation> {
        let url = format!(
            "{}/1/user/{}/recommendation/recording?count={}",
            self.base_url, user, count
        );
        let response = match self
            .client
            .get(&url)
            .bearer_auth(token)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("recommender request failed: {}", e);
                return Vec::new();
            }
        };

        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Vec::new();
        }
        if !response.status().is_success() {
            warn!("recommender request returned {}", response.status());
            return Vec::new();
        }

        match response.json::<RecommendationsResponse>().await {
            Ok(body) => body
                .recordings
                .into_iter()
                .map(|r| Recommendation { canonical_id: r.recording_mbid, score: r.score })
                .collect(),
            Err(e) => {
                warn!("recommender response could not be parsed: {}", e);
                Vec::new()
            }
        }
    }
}
