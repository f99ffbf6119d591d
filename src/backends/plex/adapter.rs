//! Adapter layer: Convert Plex DTOs to domain models

use super::dto;
use crate::model::{CandidateSource, CandidateTrack};

/// Convert a track listing to library candidates
pub fn to_candidates(list: dto::TrackList) -> Vec<CandidateTrack> {
    list.metadata
        .into_iter()
        .map(|track| CandidateTrack {
            id: track.rating_key,
            title: track.title,
            artist: track.grandparent_title,
            album: track.parent_title,
            duration_ms: track.duration.filter(|&d| d > 0),
            source: CandidateSource::Library,
        })
        .collect()
}

/// The music section titled `preferred`, else the first music section.
pub fn find_music_section<'a>(sections: &'a [dto::Section], preferred: &str) -> Option<&'a dto::Section> {
    let mut music = sections.iter().filter(|s| s.kind == "artist");
    let first = music.clone().next();
    music.find(|s| s.title.eq_ignore_ascii_case(preferred)).or(first)
}

/// Audio playlists titled exactly `name`.
pub fn playlists_named<'a>(playlists: &'a [dto::Playlist], name: &str) -> Vec<&'a dto::Playlist> {
    playlists
        .iter()
        .filter(|p| p.playlist_type == "audio" && p.title == name)
        .collect()
}

/// Library URI listing `tracks` for playlist creation.
pub fn playlist_uri(machine_identifier: &str, tracks: &[CandidateTrack]) -> String {
    let keys: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
    format!(
        "server://{}/com.plexapp.plugins.library/library/metadata/{}",
        machine_identifier,
        keys.join(",")
    )
}
