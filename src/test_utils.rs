//! Test utilities and fixtures for soulsync tests.
//!
//! Builders for catalog tracks, library candidates and raw peer responses,
//! plus a throwaway on-disk match cache database.
//!
//! # Example
//!
//! ```ignore
//! use soulsync::test_utils::{candidate, source_track};
//!
//! let source = source_track("Creep", &["Radiohead"], 238_000);
//! let cand = candidate("Creep", "Radiohead", Some(239_000));
//! ```

use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::model::{CandidateSource, CandidateTrack, SourceTrack};
use crate::search::{RawFile, RawSearchResponse};

/// Creates a temporary match cache database with migrations applied.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// A catalog track with an id derived from its title.
pub fn source_track(title: &str, artists: &[&str], duration_ms: u64) -> SourceTrack {
    SourceTrack {
        id: format!("spotify:{}", title.to_lowercase().replace(' ', "-")),
        title: title.to_string(),
        artists: artists.iter().map(|a| a.to_string()).collect(),
        album: "Test Album".to_string(),
        duration_ms,
    }
}

/// A library candidate.
pub fn candidate(title: &str, artist: &str, duration_ms: Option<u64>) -> CandidateTrack {
    CandidateTrack {
        id: format!("plex-{}", title.to_lowercase().replace(' ', "-")),
        title: title.to_string(),
        artist: artist.to_string(),
        album: "Test Album".to_string(),
        duration_ms,
        source: CandidateSource::Library,
    }
}

/// A file record with no bitrate or length.
pub fn raw_file(filename: &str, size: u64) -> RawFile {
    RawFile {
        filename: filename.to_string(),
        size,
        bitrate: None,
        length: None,
    }
}

/// A peer response from an idle peer (no free slots, no speed, empty queue).
pub fn raw_response(username: &str, files: Vec<RawFile>) -> RawSearchResponse {
    RawSearchResponse {
        username: username.to_string(),
        free_upload_slots: 0,
        upload_speed: 0,
        queue_length: 0,
        files,
    }
}

/// A full album folder of numbered flac files under `dir`.
pub fn album_response(username: &str, dir: &str, artist: &str, track_count: u32) -> RawSearchResponse {
    let files = (1..=track_count)
        .map(|n| {
            raw_file(
                &format!("{}\\{:02} - {} - Song {}.flac", dir, n, artist, n),
                30_000_000,
            )
        })
        .collect();
    raw_response(username, files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (pool, _dir) = temp_db().await;

        let count = crate::db::count_tracks(&pool).await.unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_source_track_defaults() {
        let track = source_track("Song Two", &["Blur"], 120_000);
        assert_eq!(track.id, "spotify:song-two");
        assert_eq!(track.artists, vec!["Blur".to_string()]);
        assert_eq!(track.duration_ms, 120_000);
    }

    #[test]
    fn test_album_response_builds_numbered_files() {
        let response = album_response("peer", "Music\\Album", "Band", 3);
        assert_eq!(response.files.len(), 3);
        assert!(response.files[2].filename.ends_with("03 - Band - Song 3.flac"));
    }
}
