//! Trait definitions for external service clients.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses the real client implementations, while tests
//! can substitute mock implementations.
//!
//! # Example
//!
//! ```ignore
//! use soulsync::backends::traits::LibraryApi;
//!
//! async fn scan_if_idle(library: &dyn LibraryApi) -> Result<bool, BackendError> {
//!     if library.is_library_scanning("Music").await? {
//!         return Ok(false);
//!     }
//!     library.trigger_library_scan().await
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::model::{CandidateTrack, DownloadStatus, SourceTrack};
use crate::search::RawSearchResponse;

/// Music catalog (what the user wants).
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_track(&self, id: &str) -> Result<SourceTrack, BackendError>;

    /// Every track of a playlist, in playlist order.
    async fn fetch_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<SourceTrack>, BackendError>;

    async fn fetch_playlist_name(&self, playlist_id: &str) -> Result<String, BackendError>;
}

/// Local media library (what the user has).
#[async_trait]
pub trait LibraryApi: Send + Sync {
    /// Free-text track search.
    async fn search_candidates(&self, query: &str, limit: usize) -> Result<Vec<CandidateTrack>, BackendError>;

    /// Ask the server to rescan its music section. `Ok(false)` means the
    /// server refused.
    async fn trigger_library_scan(&self) -> Result<bool, BackendError>;

    async fn is_library_scanning(&self, section: &str) -> Result<bool, BackendError>;

    /// Replace the playlist `name` with `tracks`. `Ok(false)` means nothing
    /// was written.
    async fn update_playlist(&self, name: &str, tracks: &[CandidateTrack]) -> Result<bool, BackendError>;
}

/// Peer-network search and download daemon.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Start a search, returning its id.
    async fn submit_search(&self, query: &str, timeout: Duration) -> Result<String, BackendError>;

    /// Every response received so far; grows between calls.
    async fn get_responses(&self, search_id: &str) -> Result<Vec<RawSearchResponse>, BackendError>;

    /// Queue a download, returning its id.
    async fn start_download(&self, username: &str, filename: &str, size: u64) -> Result<String, BackendError>;

    async fn get_downloads(&self) -> Result<Vec<DownloadStatus>, BackendError>;
}

/// Persisted mirror of the library used for fast lookups.
#[async_trait]
pub trait MatchCache: Send + Sync {
    /// Best cached track for `title`/`artist` with its cache confidence.
    /// The track is `None` when nothing reaches `threshold`; the confidence
    /// is then the best score seen.
    async fn lookup(
        &self,
        title: &str,
        artist: &str,
        threshold: f64,
    ) -> crate::error::Result<(Option<CandidateTrack>, f64)>;
}

// Implement traits for real clients

#[async_trait]
impl CatalogApi for super::spotify::SpotifyClient {
    async fn fetch_track(&self, id: &str) -> Result<SourceTrack, BackendError> {
        self.track(id).await
    }

    async fn fetch_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<SourceTrack>, BackendError> {
        self.playlist_tracks(playlist_id).await
    }

    async fn fetch_playlist_name(&self, playlist_id: &str) -> Result<String, BackendError> {
        self.playlist_name(playlist_id).await
    }
}

#[async_trait]
impl LibraryApi for super::plex::PlexClient {
    async fn search_candidates(&self, query: &str, limit: usize) -> Result<Vec<CandidateTrack>, BackendError> {
        self.search_tracks(query, limit).await
    }

    async fn trigger_library_scan(&self) -> Result<bool, BackendError> {
        self.refresh_library().await
    }

    async fn is_library_scanning(&self, section: &str) -> Result<bool, BackendError> {
        self.is_scanning(section).await
    }

    async fn update_playlist(&self, name: &str, tracks: &[CandidateTrack]) -> Result<bool, BackendError> {
        self.update_playlist(name, tracks).await
    }
}

#[async_trait]
impl SearchBackend for super::slskd::SlskdClient {
    async fn submit_search(&self, query: &str, timeout: Duration) -> Result<String, BackendError> {
        self.submit_search(query, timeout).await
    }

    async fn get_responses(&self, search_id: &str) -> Result<Vec<RawSearchResponse>, BackendError> {
        self.search_responses(search_id).await
    }

    async fn start_download(&self, username: &str, filename: &str, size: u64) -> Result<String, BackendError> {
        self.download(username, filename, size).await
    }

    async fn get_downloads(&self) -> Result<Vec<DownloadStatus>, BackendError> {
        self.downloads().await
    }
}

#[async_trait]
impl MatchCache for crate::db::SqliteMatchCache {
    async fn lookup(
        &self,
        title: &str,
        artist: &str,
        threshold: f64,
    ) -> crate::error::Result<(Option<CandidateTrack>, f64)> {
        self.lookup(title, artist, threshold).await
    }
}

/// Mock collaborators for testing.
///
/// Each mock replays scripted results and records how it was called.
#[cfg(test)]
pub mod mocks {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// Mock catalog serving a fixed set of tracks.
    #[derive(Default)]
    pub struct MockCatalog {
        pub tracks: Vec<SourceTrack>,
        pub playlist_name: String,
        /// Error to return (takes precedence over tracks)
        pub error: Option<BackendError>,
    }

    impl MockCatalog {
        pub fn with_tracks(tracks: Vec<SourceTrack>) -> Self {
            Self {
                tracks,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl CatalogApi for MockCatalog {
        async fn fetch_track(&self, id: &str) -> Result<SourceTrack, BackendError> {
            if let Some(ref err) = self.error {
                return Err(err.clone());
            }
            self.tracks
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| BackendError::NotFound(id.to_string()))
        }

        async fn fetch_playlist_tracks(&self, _playlist_id: &str) -> Result<Vec<SourceTrack>, BackendError> {
            if let Some(ref err) = self.error {
                return Err(err.clone());
            }
            Ok(self.tracks.clone())
        }

        async fn fetch_playlist_name(&self, playlist_id: &str) -> Result<String, BackendError> {
            if let Some(ref err) = self.error {
                return Err(err.clone());
            }
            if self.playlist_name.is_empty() {
                return Err(BackendError::NotFound(format!("playlist {}", playlist_id)));
            }
            Ok(self.playlist_name.clone())
        }
    }

    /// Mock media server.
    ///
    /// Search returns candidates whose title appears in the query. Scan
    /// status replays `scanning` front to back, then reports idle. Playlist
    /// writes are recorded and answered with `playlist_result`.
    pub struct MockLibrary {
        pub candidates: Vec<CandidateTrack>,
        pub trigger_result: Result<bool, BackendError>,
        pub playlist_result: Result<bool, BackendError>,
        pub playlists: Mutex<Vec<(String, Vec<String>)>>,
        pub scanning: Mutex<VecDeque<Result<bool, BackendError>>>,
        pub queries: Mutex<Vec<String>>,
        triggers: AtomicUsize,
        status_polls: AtomicUsize,
    }

    impl Default for MockLibrary {
        fn default() -> Self {
            Self {
                candidates: Vec::new(),
                trigger_result: Ok(true),
                playlist_result: Ok(true),
                playlists: Mutex::new(Vec::new()),
                scanning: Mutex::new(VecDeque::new()),
                queries: Mutex::new(Vec::new()),
                triggers: AtomicUsize::new(0),
                status_polls: AtomicUsize::new(0),
            }
        }
    }

    impl MockLibrary {
        pub fn with_candidates(candidates: Vec<CandidateTrack>) -> Self {
            Self {
                candidates,
                ..Default::default()
            }
        }

        pub fn with_trigger_result(trigger_result: Result<bool, BackendError>) -> Self {
            Self {
                trigger_result,
                ..Default::default()
            }
        }

        /// Scripted answers for `is_library_scanning`.
        pub fn with_scan_script(script: Vec<Result<bool, BackendError>>) -> Self {
            Self {
                scanning: Mutex::new(script.into()),
                ..Default::default()
            }
        }

        pub fn with_playlist_result(mut self, playlist_result: Result<bool, BackendError>) -> Self {
            self.playlist_result = playlist_result;
            self
        }

        pub fn trigger_count(&self) -> usize {
            self.triggers.load(Ordering::SeqCst)
        }

        pub fn status_poll_count(&self) -> usize {
            self.status_polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LibraryApi for MockLibrary {
        async fn search_candidates(&self, query: &str, limit: usize) -> Result<Vec<CandidateTrack>, BackendError> {
            self.queries.lock().push(query.to_string());
            let query = query.to_lowercase();
            Ok(self
                .candidates
                .iter()
                .filter(|c| query.contains(&c.title.to_lowercase()))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn trigger_library_scan(&self) -> Result<bool, BackendError> {
            self.triggers.fetch_add(1, Ordering::SeqCst);
            self.trigger_result.clone()
        }

        async fn is_library_scanning(&self, _section: &str) -> Result<bool, BackendError> {
            self.status_polls.fetch_add(1, Ordering::SeqCst);
            self.scanning.lock().pop_front().unwrap_or(Ok(false))
        }

        async fn update_playlist(&self, name: &str, tracks: &[CandidateTrack]) -> Result<bool, BackendError> {
            let ids = tracks.iter().map(|t| t.id.clone()).collect();
            self.playlists.lock().push((name.to_string(), ids));
            self.playlist_result.clone()
        }
    }

    /// Mock slskd daemon.
    ///
    /// Each `get_responses` call consumes one scripted poll; once the script
    /// runs out the last successful listing is repeated.
    #[derive(Default)]
    pub struct MockSearchBackend {
        pub submit_error: Option<BackendError>,
        pub polls: Mutex<VecDeque<Result<Vec<RawSearchResponse>, BackendError>>>,
        pub downloads: Mutex<VecDeque<Vec<DownloadStatus>>>,
        pub download_error: Option<BackendError>,
        pub started: Mutex<Vec<(String, String, u64)>>,
        last_listing: Mutex<Vec<RawSearchResponse>>,
        poll_count: AtomicUsize,
    }

    impl MockSearchBackend {
        pub fn with_polls(polls: Vec<Result<Vec<RawSearchResponse>, BackendError>>) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
                ..Default::default()
            }
        }

        pub fn failing_submit(error: BackendError) -> Self {
            Self {
                submit_error: Some(error),
                ..Default::default()
            }
        }

        pub fn poll_count(&self) -> usize {
            self.poll_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchBackend for MockSearchBackend {
        async fn submit_search(&self, _query: &str, _timeout: Duration) -> Result<String, BackendError> {
            match self.submit_error {
                Some(ref err) => Err(err.clone()),
                None => Ok("search-1".to_string()),
            }
        }

        async fn get_responses(&self, _search_id: &str) -> Result<Vec<RawSearchResponse>, BackendError> {
            self.poll_count.fetch_add(1, Ordering::SeqCst);
            match self.polls.lock().pop_front() {
                Some(Ok(listing)) => {
                    *self.last_listing.lock() = listing.clone();
                    Ok(listing)
                }
                Some(Err(e)) => Err(e),
                None => Ok(self.last_listing.lock().clone()),
            }
        }

        async fn start_download(&self, username: &str, filename: &str, size: u64) -> Result<String, BackendError> {
            if let Some(ref err) = self.download_error {
                return Err(err.clone());
            }
            let mut started = self.started.lock();
            started.push((username.to_string(), filename.to_string(), size));
            Ok(format!("download-{}", started.len()))
        }

        async fn get_downloads(&self) -> Result<Vec<DownloadStatus>, BackendError> {
            let mut script = self.downloads.lock();
            if script.len() > 1 {
                return Ok(script.pop_front().unwrap_or_default());
            }
            Ok(script.front().cloned().unwrap_or_default())
        }
    }

    /// Mock match cache returning one fixed answer.
    pub struct MockMatchCache {
        pub hit: Option<CandidateTrack>,
        pub confidence: f64,
        pub lookups: Mutex<Vec<(String, String)>>,
    }

    impl MockMatchCache {
        pub fn miss() -> Self {
            Self {
                hit: None,
                confidence: 0.0,
                lookups: Mutex::new(Vec::new()),
            }
        }

        pub fn hit(track: CandidateTrack, confidence: f64) -> Self {
            Self {
                hit: Some(track),
                confidence,
                lookups: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MatchCache for MockMatchCache {
        async fn lookup(
            &self,
            title: &str,
            artist: &str,
            threshold: f64,
        ) -> crate::error::Result<(Option<CandidateTrack>, f64)> {
            self.lookups.lock().push((title.to_string(), artist.to_string()));
            if self.confidence >= threshold {
                Ok((self.hit.clone(), self.confidence))
            } else {
                Ok((None, self.confidence))
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::test_utils::{candidate, raw_response};

        #[tokio::test]
        async fn test_mock_library_search_filters_by_title() {
            let mock = MockLibrary::with_candidates(vec![candidate("Creep", "Radiohead", None)]);
            let hits = mock.search_candidates("Radiohead Creep", 10).await.unwrap();
            assert_eq!(hits.len(), 1);
            let misses = mock.search_candidates("Airbag", 10).await.unwrap();
            assert!(misses.is_empty());
            assert_eq!(mock.queries.lock().len(), 2);
        }

        #[tokio::test]
        async fn test_mock_catalog_playlist_name() {
            let mut mock = MockCatalog::with_tracks(Vec::new());
            assert!(matches!(mock.fetch_playlist_name("p1").await, Err(BackendError::NotFound(_))));
            mock.playlist_name = "Road Trip".into();
            assert_eq!(mock.fetch_playlist_name("p1").await.unwrap(), "Road Trip");
        }

        #[tokio::test]
        async fn test_mock_library_records_playlists() {
            let mock = MockLibrary::default().with_playlist_result(Ok(false));
            let written = mock
                .update_playlist("Road Trip", &[candidate("Creep", "Radiohead", None)])
                .await
                .unwrap();
            assert!(!written);
            assert_eq!(
                *mock.playlists.lock(),
                vec![("Road Trip".to_string(), vec!["plex-creep".to_string()])]
            );
        }

        #[tokio::test]
        async fn test_mock_library_scan_script() {
            let mock = MockLibrary::with_scan_script(vec![Ok(true), Err(BackendError::Network("down".into()))]);
            assert!(mock.is_library_scanning("Music").await.unwrap());
            assert!(mock.is_library_scanning("Music").await.is_err());
            assert!(!mock.is_library_scanning("Music").await.unwrap());
            assert_eq!(mock.status_poll_count(), 3);
        }

        #[tokio::test]
        async fn test_mock_search_repeats_last_listing() {
            let mock = MockSearchBackend::with_polls(vec![Ok(vec![raw_response("a", vec![])])]);
            assert_eq!(mock.get_responses("s").await.unwrap().len(), 1);
            assert_eq!(mock.get_responses("s").await.unwrap().len(), 1);
            assert_eq!(mock.poll_count(), 2);
        }

        #[tokio::test]
        async fn test_mock_cache_threshold() {
            let mock = MockMatchCache::hit(candidate("Song", "Artist", None), 0.75);
            let (hit, _) = mock.lookup("Song", "Artist", 0.7).await.unwrap();
            assert!(hit.is_some());
            let (miss, confidence) = mock.lookup("Song", "Artist", 0.8).await.unwrap();
            assert!(miss.is_none());
            assert_eq!(confidence, 0.75);
        }
    }
}
