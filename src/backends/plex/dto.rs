//! Plex API Data Transfer Objects
//!
//! Every Plex reply is wrapped in a `MediaContainer`. Only the fields this
//! crate reads are modelled.
//! DO NOT use these types outside the plex module - convert to domain types.
//!
//! Example `library/sections` reply:
//! ```json
//! {"MediaContainer": {"Directory": [
//!   {"key": "3", "type": "artist", "title": "Music", "refreshing": false}
//! ]}}
//! ```

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

/// `library/sections`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionList {
    #[serde(rename = "Directory", default)]
    pub directories: Vec<Section>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Section {
    pub key: String,
    /// "artist" for music libraries
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub refreshing: bool,
}

/// Track listings (`search`, `all`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackList {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<Track>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub rating_key: String,
    #[serde(default)]
    pub title: String,
    /// Artist
    #[serde(default)]
    pub grandparent_title: String,
    /// Album
    #[serde(default)]
    pub parent_title: String,
    /// Milliseconds
    pub duration: Option<u64>,
}

/// `identity`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub machine_identifier: String,
}

/// `playlists`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistList {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<Playlist>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub rating_key: String,
    #[serde(default)]
    pub title: String,
    /// "audio" for music playlists
    #[serde(default)]
    pub playlist_type: String,
}
