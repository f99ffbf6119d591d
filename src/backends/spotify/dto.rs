//! Spotify API Data Transfer Objects
//!
//! These types match the Spotify Web API JSON structure exactly.
//! DO NOT use these types outside the spotify module - convert to domain types.

use serde::Deserialize;

/// `GET v1/tracks/{id}` and the `track` field of playlist items
#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    /// Local files in playlists have no id
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    pub name: String,
}

/// One page of `GET v1/playlists/{id}/tracks`
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    /// Absolute URL of the next page
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    /// Null for removed or unavailable tracks
    pub track: Option<Track>,
}

/// `GET v1/playlists/{id}?fields=name`
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistInfo {
    pub name: String,
}
