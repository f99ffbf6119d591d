//! Core data models shared by matching, search and sync.
//!
//! Defines the two sides of every comparison: [`SourceTrack`] (what the
//! music catalog says the user wants) and [`CandidateTrack`] (what the local
//! library or the match cache says it has). Peer-network results live in
//! [`crate::search`] because they carry transfer metadata as well.

use serde::{Deserialize, Serialize};

/// A track as reported by the music catalog provider.
///
/// Immutable once fetched; matching only ever borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTrack {
    /// Catalog identifier
    pub id: String,
    /// Track title as published
    pub title: String,
    /// Ordered artist names, primary artist first
    pub artists: Vec<String>,
    /// Album title
    #[serde(default)]
    pub album: String,
    /// Duration in milliseconds
    #[serde(default)]
    pub duration_ms: u64,
}

impl SourceTrack {
    /// Primary artist, or an empty string for malformed catalog data.
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or_default()
    }

    /// "Artist - Title" label used in logs and progress output.
    pub fn display_name(&self) -> String {
        match self.artists.first() {
            Some(artist) => format!("{} - {}", artist, self.title),
            None => self.title.clone(),
        }
    }
}

/// Where a [`CandidateTrack`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Live query against the media server
    Library,
    /// Row from the persisted match cache
    Cache,
}

/// A track already present in the local library (or its cached mirror).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrack {
    /// Library identifier (Plex rating key)
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Duration in milliseconds, when the library knows it
    pub duration_ms: Option<u64>,
    pub source: CandidateSource,
}

/// One transfer as reported by the peer-network daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadStatus {
    pub id: String,
    pub filename: String,
    pub username: String,
    /// Raw daemon state, e.g. "InProgress" or "Completed, Succeeded"
    pub state: String,
    /// Percent complete, 0-100
    pub progress: f64,
    pub size: u64,
}

impl DownloadStatus {
    /// Finished, successfully or not.
    pub fn is_complete(&self) -> bool {
        self.state.starts_with("Completed")
    }

    pub fn is_success(&self) -> bool {
        self.is_complete() && self.state.contains("Succeeded")
    }
}

/// Parse a JSON array of catalog tracks, e.g. an exported playlist.
///
/// Tracks without a title are rejected.
pub fn tracks_from_json(json: &str) -> crate::error::Result<Vec<SourceTrack>> {
    let tracks: Vec<SourceTrack> =
        serde_json::from_str(json).map_err(|e| crate::error::Error::invalid_input(format!("track list: {}", e)))?;

    if let Some(position) = tracks.iter().position(|t| t.title.trim().is_empty()) {
        return Err(crate::error::Error::invalid_input(format!("track {} has no title", position + 1)));
    }
    Ok(tracks)
}
