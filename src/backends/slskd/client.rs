//! slskd HTTP client
//!
//! ## API Quirks
//!
//! - Search timeouts are in milliseconds.
//! - Responses accumulate server-side; `GET searches/{id}/responses`
//!   always returns everything received so far.
//! - Enqueueing a download sometimes answers with the transfer record,
//!   sometimes with a list of them and sometimes with an empty body. When
//!   no id comes back the filename is used as the download id.
//! - Filenames are peer paths, usually with Windows separators; they must
//!   be sent back exactly as received.

use std::time::Duration;

use super::{adapter, dto};
use crate::error::BackendError;
use crate::model::DownloadStatus;
use crate::search::RawSearchResponse;

/// slskd REST client
pub struct SlskdClient {
    api_key: Option<String>,
    http_client: reqwest::Client,
    base_url: String,
}

impl SlskdClient {
    /// Create a client for the daemon at `base_url`, e.g.
    /// `http://localhost:5030`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_key,
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v0/{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http_client.request(method, self.endpoint(path));
        match &self.api_key {
            Some(key) => builder.header("X-API-Key", key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder, path: &str) -> Result<reqwest::Response, BackendError> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            tracing::warn!(target: "backend::slskd", status = %response.status(), endpoint = path, "Request failed");
            return Err(BackendError::Status {
                status: response.status().as_u16(),
                endpoint: path.to_string(),
            });
        }
        Ok(response)
    }

    /// Start a search and return its id
    pub async fn submit_search(&self, query: &str, timeout: Duration) -> Result<String, BackendError> {
        let body = dto::SearchRequest {
            search_text: query,
            timeout: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            filter_responses: true,
            minimum_response_file_count: 1,
            minimum_peer_upload_speed: 0,
        };

        let response = self
            .send(self.request(reqwest::Method::POST, "searches").json(&body), "searches")
            .await?;
        let created: dto::SearchCreated = response.json().await?;

        let id = created
            .id
            .ok_or_else(|| BackendError::Parse("search reply carried no id".to_string()))?;
        tracing::debug!(target: "backend::slskd", search_id = %id, query, "Search created");
        Ok(id)
    }

    /// All responses received for a search so far
    pub async fn search_responses(&self, search_id: &str) -> Result<Vec<RawSearchResponse>, BackendError> {
        let path = format!("searches/{}/responses", urlencoding::encode(search_id));
        let response = self.send(self.request(reqwest::Method::GET, &path), &path).await?;
        let responses: Vec<dto::PeerResponse> = response.json().await?;
        Ok(adapter::to_raw_responses(responses))
    }

    /// Enqueue one file from `username`
    pub async fn download(&self, username: &str, filename: &str, size: u64) -> Result<String, BackendError> {
        let path = format!("transfers/downloads/{}", urlencoding::encode(username));
        let body = [dto::DownloadRequest { filename, size }];

        let response = self
            .send(self.request(reqwest::Method::POST, &path).json(&body), &path)
            .await?;
        let text = response.text().await?;
        let reply: serde_json::Value = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);

        let id = adapter::download_id(&reply).unwrap_or_else(|| filename.to_string());
        tracing::info!(target: "backend::slskd", username, filename, download_id = %id, "Download queued");
        Ok(id)
    }

    /// Every transfer the daemon knows about
    pub async fn downloads(&self) -> Result<Vec<DownloadStatus>, BackendError> {
        let path = "transfers/downloads";
        let response = self.send(self.request(reqwest::Method::GET, path), path).await?;
        let users: Vec<dto::UserTransfers> = response.json().await?;
        Ok(adapter::to_download_statuses(users))
    }
}
