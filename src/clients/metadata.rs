//! Metadata authority client — a MusicBrainz-style resolver, following
//! the usual request shape for this kind of API (503 treated as an
//! empty, retryable result rather than a hard error) with the
//! album/release-group lookups the queue and discovery jobs need.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ResolvedRecording {
    pub artist: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedAlbum {
    pub artist: String,
    pub album_title: String,
    pub album_id: String,
    pub track_title: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ReleaseGroup {
    pub id: String,
    pub title: String,
    pub group_type: String,
    pub first_release_date: Option<String>,
}

#[derive(Deserialize)]
struct RecordingLookupResponse {
    title: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCreditEntry>,
    #[serde(default)]
    releases: Vec<RawRelease>,
}

#[derive(Deserialize)]
struct ArtistCreditEntry {
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawRelease {
    id: Option<String>,
    title: Option<String>,
    date: Option<String>,
    #[serde(rename = "release-group")]
    release_group: Option<RawReleaseGroup>,
}

#[derive(Deserialize)]
struct RawReleaseGroup {
    #[serde(rename = "primary-type")]
    primary_type: Option<String>,
}

#[derive(Deserialize)]
struct ReleaseGroupSearchResponse {
    #[serde(rename = "release-groups", default)]
    release_groups: Vec<RawReleaseGroupSearchResult>,
}

#[derive(Deserialize)]
struct RawReleaseGroupSearchResult {
    id: String,
    title: String,
    #[serde(rename = "primary-type")]
    primary_type: Option<String>,
    #[serde(rename = "first-release-date")]
    first_release_date: Option<String>,
}

pub struct MetadataClient {
    client: Client,
    base_url: String,
}

impl MetadataClient {
    pub fn new(base_url: String, user_agent: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client, base_url })
    }

    async fn lookup_recording(&self, id: &str) -> Option<RecordingLookupResponse> {
        let url = format!("{}/recording/{}?inc=artist-credits+releases+release-groups&fmt=json", self.base_url, id);
        let response = self.client.get(&url).send().await.ok()?;
        if response.status().as_u16() == 503 {
            debug!("metadata lookup for {} rate-limited", id);
            return None;
        }
        if !response.status().is_success() {
            return None;
        }
        response.json().await.ok()
    }

    pub async fn resolve_recording(&self, id: &str) -> Option<ResolvedRecording> {
        let body = self.lookup_recording(id).await?;
        let title = body.title?;
        let artist = body.artist_credit.into_iter().find_map(|c| c.name)?;
        Some(ResolvedRecording { artist, title })
    }

    /// When multiple releases exist, prefer one whose release-group
    /// type is "Album"; otherwise the first.
    pub async fn resolve_recording_to_album(&self, id: &str) -> Option<ResolvedAlbum> {
        let body = self.lookup_recording(id).await?;
        let track_title = body.title.clone()?;
        let artist = body.artist_credit.iter().find_map(|c| c.name.clone())?;

        let release = body
            .releases
            .iter()
            .find(|r| {
                r.release_group
                    .as_ref()
                    .and_then(|rg| rg.primary_type.as_deref())
                    == Some("Album")
            })
            .or_else(|| body.releases.first())?;

        let album_id = release.id.clone()?;
        let album_title = release.title.clone()?;
        let year = release
            .date
            .as_deref()
            .and_then(|d| d.get(0..4))
            .and_then(|y| y.parse().ok());

        Some(ResolvedAlbum { artist, album_title, album_id, track_title, year })
    }

    pub async fn search_release_groups(&self, artist: &str, type_filter: &str, limit: usize) -> Vec<ReleaseGroup> {
        let query = format!("artist:\"{}\" AND primarytype:{}", artist, type_filter);
        let url = format!(
            "{}/release-group/?query={}&fmt=json&limit={}",
            self.base_url,
            urlencoding::encode(&query),
            limit
        );

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("release-group search failed for {}: {}", artist, e);
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            return Vec::new();
        }

        let body: ReleaseGroupSearchResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                debug!("release-group search response for {} could not be parsed: {}", artist, e);
                return Vec::new();
            }
        };

        body.release_groups
            .into_iter()
            .map(|rg| ReleaseGroup {
                id: rg.id,
                title: rg.title,
                group_type: rg.primary_type.unwrap_or_default(),
                first_release_date: rg.first_release_date,
            })
            .collect()
    }
}
