//! Adapter layer: Convert Spotify DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.

use super::dto;
use crate::model::SourceTrack;

/// Convert a Spotify track. Tracks without an id (local files) are skipped.
pub fn to_source_track(track: dto::Track) -> Option<SourceTrack> {
    let id = track.id?;
    Some(SourceTrack {
        id,
        title: track.name,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album: track.album.map(|a| a.name).unwrap_or_default(),
        duration_ms: track.duration_ms,
    })
}

/// Tracks of one playlist page, dropping null and local entries
pub fn page_tracks(page: dto::PlaylistPage) -> Vec<SourceTrack> {
    page.items
        .into_iter()
        .filter_map(|item| item.track)
        .filter_map(to_source_track)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_conversion() {
        let json = r#"{
            "id": "3z8h0TU7ReDPLIbEnYhWZb",
            "name": "Bohemian Rhapsody",
            "artists": [{"name": "Queen"}],
            "album": {"name": "A Night at the Opera"},
            "duration_ms": 354947
        }"#;
        let track: dto::Track = serde_json::from_str(json).unwrap();
        let source = to_source_track(track).unwrap();

        assert_eq!(source.id, "3z8h0TU7ReDPLIbEnYhWZb");
        assert_eq!(source.artists, vec!["Queen"]);
        assert_eq!(source.album, "A Night at the Opera");
        assert_eq!(source.duration_ms, 354_947);
    }

    #[test]
    fn test_page_skips_missing_tracks() {
        let json = r#"{
            "items": [
                {"track": {"id": "a", "name": "One", "artists": [{"name": "X"}, {"name": "Y"}], "album": {"name": "Al"}, "duration_ms": 1000}},
                {"track": null},
                {"track": {"id": null, "name": "Local file", "artists": [], "album": null, "duration_ms": 0}}
            ],
            "next": "https://api.spotify.com/v1/playlists/p/tracks?offset=100&limit=100"
        }"#;
        let page: dto::PlaylistPage = serde_json::from_str(json).unwrap();
        assert!(page.next.is_some());

        let tracks = page_tracks(page);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artists, vec!["X", "Y"]);
    }
}
