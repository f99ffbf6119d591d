//! Plex HTTP client
//!
//! ## API Quirks
//!
//! - Without `Accept: application/json` the server answers in XML.
//! - Music libraries are sections of type `artist`. Tracks are metadata
//!   type 10; artist and album titles come back as `grandparentTitle` and
//!   `parentTitle`.
//! - A refresh request returns immediately. Progress is only visible via the
//!   section's `refreshing` flag.
//! - Playlist updates delete every audio playlist with that title and create
//!   a new one. Creation takes a `server://{machineIdentifier}/...` URI
//!   listing the rating keys.

use std::time::Duration;

use super::{adapter, dto};
use crate::error::BackendError;
use crate::model::CandidateTrack;

/// Plex metadata type for tracks
const TRACK_TYPE: &str = "10";

/// Plex server client
pub struct PlexClient {
    token: Option<String>,
    http_client: reqwest::Client,
    base_url: String,
    music_section: String,
}

impl PlexClient {
    /// `music_section` names the preferred music library. The first music
    /// library is used when no section carries that title.
    pub fn new(base_url: impl Into<String>, token: Option<String>, music_section: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            token,
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            music_section: music_section.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, BackendError> {
        let token = self.token.as_deref().ok_or(BackendError::NotConfigured("Plex token"))?;

        let response = self
            .http_client
            .request(method, self.endpoint(path))
            .header("Accept", "application/json")
            .header("X-Plex-Token", token)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(target: "backend::plex", status = %response.status(), endpoint = path, "Request failed");
            return Err(BackendError::Status {
                status: response.status().as_u16(),
                endpoint: path.to_string(),
            });
        }
        Ok(response)
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, BackendError> {
        self.send(reqwest::Method::GET, path, query).await
    }

    async fn sections(&self) -> Result<Vec<dto::Section>, BackendError> {
        let response = self.get("library/sections", &[]).await?;
        let envelope: dto::Envelope<dto::SectionList> = response.json().await?;
        Ok(envelope.media_container.directories)
    }

    async fn music_section(&self, preferred: &str) -> Result<dto::Section, BackendError> {
        let sections = self.sections().await?;
        adapter::find_music_section(&sections, preferred)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("music library '{}'", preferred)))
    }

    /// Search the music library for tracks matching `query`
    pub async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<CandidateTrack>, BackendError> {
        let section = self.music_section(&self.music_section).await?;
        let path = format!("library/sections/{}/search", section.key);
        let limit_param = limit.to_string();

        let response = self
            .get(&path, &[("type", TRACK_TYPE), ("query", query), ("limit", limit_param.as_str())])
            .await?;
        let envelope: dto::Envelope<dto::TrackList> = response.json().await?;

        let mut candidates = adapter::to_candidates(envelope.media_container);
        candidates.truncate(limit);
        tracing::debug!(target: "backend::plex", query, found = candidates.len(), "Library search");
        Ok(candidates)
    }

    /// Every track in the music library
    pub async fn all_tracks(&self) -> Result<Vec<CandidateTrack>, BackendError> {
        let section = self.music_section(&self.music_section).await?;
        let path = format!("library/sections/{}/all", section.key);

        let response = self.get(&path, &[("type", TRACK_TYPE)]).await?;
        let envelope: dto::Envelope<dto::TrackList> = response.json().await?;
        Ok(adapter::to_candidates(envelope.media_container))
    }

    /// Ask the server to rescan the music library.
    ///
    /// `Ok(true)` means the server accepted the request.
    pub async fn refresh_library(&self) -> Result<bool, BackendError> {
        let section = self.music_section(&self.music_section).await?;
        let path = format!("library/sections/{}/refresh", section.key);

        self.get(&path, &[]).await?;
        tracing::info!(target: "backend::plex", section = %section.title, "Library refresh requested");
        Ok(true)
    }

    /// Whether the named music library is currently being scanned
    pub async fn is_scanning(&self, section: &str) -> Result<bool, BackendError> {
        Ok(self.music_section(section).await?.refreshing)
    }

    /// Replace the audio playlist `name` with `tracks`, in order.
    ///
    /// Returns `Ok(false)` without contacting the server when `tracks` is
    /// empty.
    pub async fn update_playlist(&self, name: &str, tracks: &[CandidateTrack]) -> Result<bool, BackendError> {
        if tracks.is_empty() {
            tracing::warn!(target: "backend::plex", playlist = name, "No tracks to put in playlist");
            return Ok(false);
        }

        let response = self.get("playlists", &[("playlistType", "audio")]).await?;
        let envelope: dto::Envelope<dto::PlaylistList> = response.json().await?;
        for existing in adapter::playlists_named(&envelope.media_container.metadata, name) {
            let path = format!("playlists/{}", existing.rating_key);
            self.send(reqwest::Method::DELETE, &path, &[]).await?;
            tracing::debug!(target: "backend::plex", playlist = name, rating_key = %existing.rating_key, "Deleted old playlist");
        }

        let response = self.get("identity", &[]).await?;
        let identity: dto::Envelope<dto::Identity> = response.json().await?;
        let uri = adapter::playlist_uri(&identity.media_container.machine_identifier, tracks);

        self.send(
            reqwest::Method::POST,
            "playlists",
            &[("type", "audio"), ("title", name), ("smart", "0"), ("uri", uri.as_str())],
        )
        .await?;
        tracing::info!(target: "backend::plex", playlist = name, tracks = tracks.len(), "Playlist written");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_building() {
        let client = PlexClient::new("http://plex.local:32400/", Some("token".into()), "Music");
        assert_eq!(client.endpoint("library/sections"), "http://plex.local:32400/library/sections");
    }

    #[tokio::test]
    async fn test_missing_token_is_not_configured() {
        let client = PlexClient::new("http://127.0.0.1:9", None, "Music");
        let err = client.search_tracks("creep", 5).await.unwrap_err();
        assert!(matches!(err, BackendError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_empty_playlist_update_is_skipped() {
        // Unreachable server: any request would fail
        let client = PlexClient::new("http://127.0.0.1:9", Some("token".into()), "Music");
        assert!(!client.update_playlist("Road Trip", &[]).await.unwrap());
    }
}
