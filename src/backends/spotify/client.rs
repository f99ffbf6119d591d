//! Spotify Web API client
//!
//! Playlist tracks are paged 100 at a time. Each page carries the absolute
//! URL of the next one, which is followed until it is null.

use std::time::Duration;

use super::{adapter, dto};
use crate::error::BackendError;
use crate::model::SourceTrack;

const API_BASE: &str = "https://api.spotify.com/v1";

/// Spotify client with a fixed access token
pub struct SpotifyClient {
    access_token: Option<String>,
    http_client: reqwest::Client,
    base_url: String,
}

impl SpotifyClient {
    pub fn new(access_token: Option<String>) -> Self {
        Self::with_base_url(API_BASE, access_token)
    }

    pub fn with_base_url(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            access_token,
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, BackendError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(BackendError::NotConfigured("Spotify access token"))?;

        let response = self.http_client.get(url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            tracing::warn!(target: "backend::spotify", status = %response.status(), url, "Request failed");
            return Err(BackendError::Status {
                status: response.status().as_u16(),
                endpoint: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }

    /// Fetch one track by id
    pub async fn track(&self, id: &str) -> Result<SourceTrack, BackendError> {
        let url = format!("{}/tracks/{}", self.base_url, urlencoding::encode(id));
        let track: dto::Track = self.get_json(&url).await?;
        adapter::to_source_track(track).ok_or_else(|| BackendError::NotFound(format!("track {}", id)))
    }

    /// Display name of a playlist
    pub async fn playlist_name(&self, playlist_id: &str) -> Result<String, BackendError> {
        let url = format!("{}/playlists/{}?fields=name", self.base_url, urlencoding::encode(playlist_id));
        let info: dto::PlaylistInfo = self.get_json(&url).await?;
        Ok(info.name)
    }

    /// Every track of a playlist, following pagination
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<SourceTrack>, BackendError> {
        let mut url = Some(format!(
            "{}/playlists/{}/tracks?limit=100",
            self.base_url,
            urlencoding::encode(playlist_id)
        ));
        let mut tracks = Vec::new();

        while let Some(page_url) = url {
            let page: dto::PlaylistPage = self.get_json(&page_url).await?;
            url = page.next.clone();
            tracks.extend(adapter::page_tracks(page));
        }

        tracing::info!(target: "backend::spotify", playlist_id, tracks = tracks.len(), "Fetched playlist");
        Ok(tracks)
    }
}
