//! Peer-search client — a Soulseek-style (slskd) search/transfer
//! adapter: bearer-authed REST calls against a local daemon. State is
//! driven by polling rather than subscribing to a push stream, which
//! keeps the download engine's step function simple and synchronous
//! with its own tick.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct SearchHandle(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerFile {
    pub filename: String,
    pub size: u64,
    pub bit_rate: Option<u32>,
    pub bit_depth: Option<u32>,
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerResponse {
    pub username: String,
    pub files: Vec<PeerFile>,
    pub has_slot: Option<bool>,
    pub upload_speed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferFileState {
    pub filename: String,
    pub state: String,
    pub bytes_transferred: u64,
    pub size: u64,
    pub speed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferState {
    pub username: String,
    pub directory: String,
    pub files: Vec<TransferFileState>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    timeout_ms: u64,
    min_responses: usize,
}

#[derive(Deserialize)]
struct SearchCreated {
    id: String,
}

#[derive(Deserialize)]
struct SearchStatus {
    state: String,
}

#[derive(Serialize)]
struct EnqueueRequest<'a> {
    files: &'a [String],
}

#[derive(Clone)]
pub struct PeerSearchClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PeerSearchClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self { client: Client::new(), base_url, api_key }
    }

    pub async fn search(&self, query: &str, timeout_ms: u64, min_responses: usize) -> Result<SearchHandle> {
        let url = format!("{}/api/v0/searches", self.base_url);
        let body = SearchRequest { query, timeout_ms, min_responses };
        let created: SearchCreated = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("peer search request failed")?
            .error_for_status()
            .context("peer search request rejected")?
            .json()
            .await
            .context("peer search response malformed")?;
        Ok(SearchHandle(created.id))
    }

    pub async fn poll_state(&self, handle: &SearchHandle) -> Result<SearchState> {
        let url = format!("{}/api/v0/searches/{}", self.base_url, handle.0);
        let status: SearchStatus = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("peer search status request failed")?
            .error_for_status()?
            .json()
            .await
            .context("peer search status malformed")?;

        Ok(match status.state.to_lowercase().as_str() {
            "completed" | "timedout" | "timed_out" => SearchState::Completed,
            "cancelled" | "canceled" => SearchState::Cancelled,
            _ => SearchState::InProgress,
        })
    }

    pub async fn responses(&self, handle: &SearchHandle) -> Result<Vec<PeerResponse>> {
        let url = format!("{}/api/v0/searches/{}/responses", self.base_url, handle.0);
        self.client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("peer search responses request failed")?
            .error_for_status()?
            .json()
            .await
            .context("peer search responses malformed")
    }

    pub async fn delete(&self, handle: &SearchHandle) -> Result<()> {
        let url = format!("{}/api/v0/searches/{}", self.base_url, handle.0);
        self.client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("peer search delete failed")?;
        Ok(())
    }

    pub async fn enqueue(&self, username: &str, files: &[String]) -> Result<()> {
        let url = format!("{}/api/v0/transfers/downloads/{}", self.base_url, username);
        self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EnqueueRequest { files })
            .send()
            .await
            .context("enqueue request failed")?
            .error_for_status()
            .context("enqueue request rejected")?;
        Ok(())
    }

    pub async fn transfers(&self) -> Result<Vec<TransferState>> {
        let url = format!("{}/api/v0/transfers/downloads", self.base_url);
        self.client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("transfers request failed")?
            .error_for_status()?
            .json()
            .await
            .context("transfers response malformed")
    }
}

/// Per-client poll interval, max wait per search, and the per-search
/// timeout passed to the peer.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_SEARCH_WAIT: Duration = Duration::from_secs(20);
pub const PEER_SEARCH_TIMEOUT_MS: u64 = 15_000;
