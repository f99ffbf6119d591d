//! Library sync and download-missing workflow.
//!
//! For every catalog track the service decides whether the library already
//! has it: the match cache is asked first (one lookup per credited artist),
//! then the live library. Tracks still missing can be searched for on the
//! peer network and the best usable file queued for download. When syncing a
//! named playlist, the matched library tracks are written back to a library
//! playlist of the same name.
//! [`DownloadMonitor`] follows those downloads and asks the scan controller
//! for a library rescan as each one lands.

mod monitor;

pub use monitor::{DownloadMonitor, WatchOutcome};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::traits::{LibraryApi, MatchCache, SearchBackend};
use crate::config::Config;
use crate::error::{CallbackResult, Result};
use crate::matching::{MatchResult, clean_artist, clean_title, find_best_match};
use crate::model::{CandidateTrack, SourceTrack};
use crate::search::{CancelFlag, SearchOrchestrator};

/// Library candidates fetched per query.
const LIBRARY_QUERY_LIMIT: usize = 20;

/// Tunables for [`SyncService`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Minimum cache confidence for a cached row to be considered
    pub cache_threshold: f64,
    /// Peer search duration per missing track
    pub search_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            cache_threshold: 0.7,
            search_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_threshold: config.matching.cache_threshold,
            search_timeout: config.search.timeout(),
        }
    }
}

/// Stage reported in a [`SyncProgress`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Matching,
    MatchingComplete,
    Downloading,
    UpdatingPlaylist,
    Complete,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matching => write!(f, "Matching tracks"),
            Self::MatchingComplete => write!(f, "Matching completed"),
            Self::Downloading => write!(f, "Downloading missing tracks"),
            Self::UpdatingPlaylist => write!(f, "Updating library playlist"),
            Self::Complete => write!(f, "Sync completed"),
        }
    }
}

/// Progress event delivered after each step.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncProgress {
    pub step: SyncStep,
    /// "Artist - Title" of the track being worked on, empty between tracks
    pub current_track: String,
    pub matched: usize,
    pub failed: usize,
    pub total: usize,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Library playlist written by [`SyncService::sync_playlist`]
    pub playlist: Option<String>,
    pub total: usize,
    pub matched: usize,
    /// Tracks placed in the library playlist
    pub synced: usize,
    /// Tracks the library does not have
    pub missing: Vec<SourceTrack>,
    /// Ids of downloads started for missing tracks
    pub downloads: Vec<String>,
    /// Missing tracks with no download started
    pub failed: usize,
    pub errors: Vec<String>,
    pub cancelled: bool,
}

impl SyncReport {
    /// Matched tracks as a percentage of all tracks; 0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.matched as f64 / self.total as f64 * 100.0
    }

    fn cancelled(mut self) -> Self {
        self.errors.push("Sync cancelled".to_string());
        self.cancelled = true;
        self
    }
}

/// Matches catalog tracks against the library and fetches what is missing.
pub struct SyncService {
    library: Arc<dyn LibraryApi>,
    cache: Option<Arc<dyn MatchCache>>,
    backend: Arc<dyn SearchBackend>,
    orchestrator: SearchOrchestrator,
    settings: SyncSettings,
}

impl SyncService {
    pub fn new(
        library: Arc<dyn LibraryApi>,
        cache: Option<Arc<dyn MatchCache>>,
        backend: Arc<dyn SearchBackend>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            library,
            cache,
            orchestrator: SearchOrchestrator::new(backend.clone()),
            backend,
            settings,
        }
    }

    /// Find `source` in the library.
    ///
    /// Cache hits are re-scored by the matcher, so the returned confidence
    /// is always the matcher's. Backend and cache failures are logged and
    /// treated as "no candidates".
    pub async fn match_track(&self, source: &SourceTrack) -> MatchResult<CandidateTrack> {
        if let Some(cache) = &self.cache {
            for artist in &source.artists {
                match cache.lookup(&source.title, artist, self.settings.cache_threshold).await {
                    Ok((Some(hit), cache_confidence)) => {
                        let result = find_best_match(source, std::slice::from_ref(&hit));
                        if result.is_match() {
                            tracing::debug!(
                                target: "sync",
                                track = %source.display_name(),
                                cache_confidence,
                                confidence = result.confidence(),
                                "Matched from cache"
                            );
                            return result;
                        }
                    }
                    Ok((None, _)) => {}
                    Err(e) => {
                        tracing::warn!(target: "sync", track = %source.display_name(), error = %e, "Cache lookup failed");
                    }
                }
            }
        }

        let mut queries = vec![source.title.clone()];
        if !source.primary_artist().is_empty() {
            queries.push(format!("{} {}", source.primary_artist(), source.title));
        }

        let mut candidates: Vec<CandidateTrack> = Vec::new();
        for query in &queries {
            match self.library.search_candidates(query, LIBRARY_QUERY_LIMIT).await {
                Ok(found) => {
                    for candidate in found {
                        if !candidates.iter().any(|c| c.id == candidate.id) {
                            candidates.push(candidate);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "sync", query = %query, error = %e, "Library search failed");
                }
            }
        }

        find_best_match(source, &candidates)
    }

    /// Search the peer network for `source` and queue the best usable file.
    ///
    /// Returns `Ok(None)` when no result is a confident match.
    pub async fn download_track(&self, source: &SourceTrack) -> Result<Option<String>> {
        let query = format!("{} {}", clean_artist(source.primary_artist()), clean_title(&source.title))
            .trim()
            .to_string();
        if query.is_empty() {
            return Ok(None);
        }

        let results = self.orchestrator.search_all(&query, self.settings.search_timeout).await;

        // Tracks arrive sorted best quality first.
        let Some(best) = results
            .tracks
            .iter()
            .find(|t| find_best_match(source, std::slice::from_ref(*t)).is_match())
        else {
            tracing::warn!(target: "sync", query = %query, results = results.tracks.len(), "No usable download source");
            return Ok(None);
        };

        let id = self
            .backend
            .start_download(&best.username, &best.filename, best.size)
            .await?;
        tracing::info!(
            target: "sync",
            track = %source.display_name(),
            peer = %best.username,
            quality = %best.quality,
            download_id = %id,
            "Download started"
        );
        Ok(Some(id))
    }

    /// Match every track and optionally download what is missing.
    ///
    /// `cancel` is checked between tracks. Errors from individual tracks are
    /// collected in the report rather than aborting the run.
    pub async fn sync<F>(
        &self,
        tracks: &[SourceTrack],
        download_missing: bool,
        cancel: &CancelFlag,
        on_progress: F,
    ) -> SyncReport
    where
        F: FnMut(&SyncProgress) -> CallbackResult + Send,
    {
        self.run(None, tracks, download_missing, cancel, on_progress).await
    }

    /// [`sync`](Self::sync), then replace the library playlist `name` with
    /// the matched tracks in catalog order.
    ///
    /// `synced` is the number of tracks written, 0 when the library wrote
    /// nothing. A failed write is recorded in `errors`.
    pub async fn sync_playlist<F>(
        &self,
        name: &str,
        tracks: &[SourceTrack],
        download_missing: bool,
        cancel: &CancelFlag,
        on_progress: F,
    ) -> SyncReport
    where
        F: FnMut(&SyncProgress) -> CallbackResult + Send,
    {
        self.run(Some(name), tracks, download_missing, cancel, on_progress).await
    }

    async fn run<F>(
        &self,
        playlist: Option<&str>,
        tracks: &[SourceTrack],
        download_missing: bool,
        cancel: &CancelFlag,
        mut on_progress: F,
    ) -> SyncReport
    where
        F: FnMut(&SyncProgress) -> CallbackResult + Send,
    {
        let mut report = SyncReport {
            playlist: playlist.map(str::to_string),
            total: tracks.len(),
            ..Default::default()
        };

        if tracks.is_empty() {
            report.errors.push("No tracks to sync".to_string());
            return report;
        }

        tracing::info!(target: "sync", tracks = tracks.len(), download_missing, "Starting sync");

        let mut emit = |report: &SyncReport, step: SyncStep, current_track: String| {
            let progress = SyncProgress {
                step,
                current_track,
                matched: report.matched,
                failed: report.missing.len(),
                total: report.total,
            };
            if let Err(e) = on_progress(&progress) {
                tracing::error!(target: "sync", error = %e, "Progress callback failed");
            }
        };

        let mut library_tracks = Vec::new();
        for track in tracks {
            if cancel.is_cancelled() {
                tracing::info!(target: "sync", "Sync cancelled during matching");
                return report.cancelled();
            }

            emit(&report, SyncStep::Matching, track.display_name());
            let result = self.match_track(track).await;
            match result.is_match().then(|| result.into_candidate()).flatten() {
                Some(found) => {
                    report.matched += 1;
                    library_tracks.push(found);
                }
                None => report.missing.push(track.clone()),
            }
        }

        tracing::info!(target: "sync", matched = report.matched, total = report.total, "Matching completed");
        emit(&report, SyncStep::MatchingComplete, String::new());

        if download_missing {
            let missing = report.missing.clone();
            for track in &missing {
                if cancel.is_cancelled() {
                    tracing::info!(target: "sync", "Sync cancelled during downloads");
                    report.failed = report.missing.len() - report.downloads.len();
                    return report.cancelled();
                }

                emit(&report, SyncStep::Downloading, track.display_name());
                match self.download_track(track).await {
                    Ok(Some(id)) => report.downloads.push(id),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(target: "sync", track = %track.display_name(), error = %e, "Download failed");
                        report.errors.push(format!("{}: {}", track.display_name(), e));
                    }
                }
            }
        }

        report.failed = report.missing.len() - report.downloads.len();

        if let Some(name) = playlist {
            if cancel.is_cancelled() {
                tracing::info!(target: "sync", "Sync cancelled before playlist update");
                return report.cancelled();
            }

            emit(&report, SyncStep::UpdatingPlaylist, String::new());
            match self.library.update_playlist(name, &library_tracks).await {
                Ok(true) => report.synced = library_tracks.len(),
                Ok(false) => {
                    tracing::warn!(target: "sync", playlist = name, tracks = library_tracks.len(), "Library wrote no playlist");
                }
                Err(e) => {
                    tracing::error!(target: "sync", playlist = name, error = %e, "Playlist update failed");
                    report.errors.push(format!("Failed to update playlist '{}': {}", name, e));
                }
            }
        }

        emit(&report, SyncStep::Complete, String::new());

        tracing::info!(
            target: "sync",
            matched = report.matched,
            synced = report.synced,
            downloads = report.downloads.len(),
            failed = report.failed,
            success_rate = report.success_rate(),
            "Sync finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::traits::mocks::{MockLibrary, MockMatchCache, MockSearchBackend};
    use crate::error::BackendError;
    use crate::test_utils::{candidate, raw_file, raw_response, source_track};

    fn settings() -> SyncSettings {
        SyncSettings {
            cache_threshold: 0.7,
            search_timeout: Duration::from_secs(3),
        }
    }

    fn service(library: MockLibrary, cache: Option<MockMatchCache>, backend: MockSearchBackend) -> SyncService {
        SyncService::new(
            Arc::new(library),
            cache.map(|c| Arc::new(c) as Arc<dyn MatchCache>),
            Arc::new(backend),
            settings(),
        )
    }

    #[tokio::test]
    async fn test_cache_hit_skips_library() {
        let library = Arc::new(MockLibrary::default());
        let cache = MockMatchCache::hit(candidate("Creep", "Radiohead", Some(238_000)), 0.95);
        let service = SyncService::new(
            library.clone(),
            Some(Arc::new(cache)),
            Arc::new(MockSearchBackend::default()),
            settings(),
        );

        let result = service.match_track(&source_track("Creep", &["Radiohead"], 238_000)).await;

        assert!(result.is_match());
        assert!(result.confidence() >= 0.98);
        assert!(library.queries.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cache_tries_each_artist() {
        let cache = Arc::new(MockMatchCache::miss());
        let service = SyncService::new(
            Arc::new(MockLibrary::default()),
            Some(cache.clone()),
            Arc::new(MockSearchBackend::default()),
            settings(),
        );

        let result = service
            .match_track(&source_track("Under Pressure", &["Queen", "David Bowie"], 248_000))
            .await;

        assert!(!result.is_match());
        let lookups = cache.lookups.lock();
        assert_eq!(lookups.len(), 2);
        assert_eq!(lookups[1].1, "David Bowie");
    }

    #[tokio::test]
    async fn test_library_fallback_deduplicates_candidates() {
        let library = Arc::new(MockLibrary::with_candidates(vec![candidate("Creep", "Radiohead", Some(238_000))]));
        let service = SyncService::new(
            library.clone(),
            Some(Arc::new(MockMatchCache::miss())),
            Arc::new(MockSearchBackend::default()),
            settings(),
        );

        let result = service.match_track(&source_track("Creep", &["Radiohead"], 238_000)).await;

        assert!(result.is_match());
        assert_eq!(result.candidate().unwrap().title, "Creep");
        assert_eq!(*library.queries.lock(), vec!["Creep", "Radiohead Creep"]);
    }

    #[tokio::test]
    async fn test_sync_without_downloads() {
        let service = service(
            MockLibrary::with_candidates(vec![candidate("Creep", "Radiohead", Some(238_000))]),
            None,
            MockSearchBackend::default(),
        );
        let tracks = vec![
            source_track("Creep", &["Radiohead"], 238_000),
            source_track("Airbag", &["Radiohead"], 284_000),
        ];

        let mut steps = Vec::new();
        let report = service
            .sync(&tracks, false, &CancelFlag::new(), |p| {
                steps.push(p.step);
                Ok(())
            })
            .await;

        assert_eq!(report.total, 2);
        assert_eq!(report.matched, 1);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.success_rate(), 50.0);
        assert_eq!(
            steps,
            vec![SyncStep::Matching, SyncStep::Matching, SyncStep::MatchingComplete, SyncStep::Complete]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_downloads_missing_track() {
        let backend = Arc::new(MockSearchBackend::with_polls(vec![Ok(vec![
            raw_response("junk", vec![raw_file("Someone Else - Other Song.mp3", 4_000_000)]),
            raw_response("good", vec![raw_file("Radiohead - Airbag.flac", 30_000_000)]),
        ])]));
        let service = SyncService::new(Arc::new(MockLibrary::default()), None, backend.clone(), settings());
        let tracks = vec![source_track("Airbag", &["Radiohead"], 284_000)];

        let report = service.sync(&tracks, true, &CancelFlag::new(), |_| Ok(())).await;

        assert_eq!(report.downloads, vec!["download-1"]);
        assert_eq!(report.failed, 0);
        let started = backend.started.lock();
        assert_eq!(started[0].0, "good");
        assert_eq!(started[0].1, "Radiohead - Airbag.flac");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_usable_source_counts_as_failed() {
        let backend = MockSearchBackend::with_polls(vec![Ok(vec![raw_response(
            "peer",
            vec![raw_file("Someone Else - Other Song.mp3", 4_000_000)],
        )])]);
        let service = service(MockLibrary::default(), None, backend);
        let tracks = vec![source_track("Airbag", &["Radiohead"], 284_000)];

        let report = service.sync(&tracks, true, &CancelFlag::new(), |_| Ok(())).await;

        assert!(report.downloads.is_empty());
        assert_eq!(report.failed, 1);
        assert!(report.errors.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_error_is_collected() {
        let mut backend = MockSearchBackend::with_polls(vec![Ok(vec![raw_response(
            "good",
            vec![raw_file("Radiohead - Airbag.flac", 30_000_000)],
        )])]);
        backend.download_error = Some(BackendError::Status {
            status: 500,
            endpoint: "transfers/downloads/good".into(),
        });
        let service = service(MockLibrary::default(), None, backend);
        let tracks = vec![source_track("Airbag", &["Radiohead"], 284_000)];

        let report = service.sync(&tracks, true, &CancelFlag::new(), |_| Ok(())).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Radiohead - Airbag"));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_track() {
        let service = service(MockLibrary::default(), None, MockSearchBackend::default());
        let cancel = CancelFlag::new();
        cancel.cancel();

        let report = service
            .sync(&[source_track("Creep", &["Radiohead"], 0)], false, &cancel, |_| Ok(()))
            .await;

        assert!(report.cancelled);
        assert_eq!(report.matched, 0);
        assert_eq!(report.errors, vec!["Sync cancelled"]);
    }

    #[tokio::test]
    async fn test_empty_playlist() {
        let service = service(MockLibrary::default(), None, MockSearchBackend::default());
        let report = service.sync(&[], false, &CancelFlag::new(), |_| Ok(())).await;

        assert_eq!(report.total, 0);
        assert_eq!(report.success_rate(), 0.0);
        assert_eq!(report.errors, vec!["No tracks to sync"]);
    }

    #[tokio::test]
    async fn test_sync_playlist_writes_matched_tracks_in_order() {
        let library = Arc::new(MockLibrary::with_candidates(vec![
            candidate("Creep", "Radiohead", Some(238_000)),
            candidate("Karma Police", "Radiohead", Some(264_000)),
        ]));
        let service = SyncService::new(
            library.clone(),
            None,
            Arc::new(MockSearchBackend::default()),
            settings(),
        );
        let tracks = vec![
            source_track("Karma Police", &["Radiohead"], 264_000),
            source_track("Airbag", &["Radiohead"], 284_000),
            source_track("Creep", &["Radiohead"], 238_000),
        ];

        let mut steps = Vec::new();
        let report = service
            .sync_playlist("OK Computer Mix", &tracks, false, &CancelFlag::new(), |p| {
                steps.push(p.step);
                Ok(())
            })
            .await;

        assert_eq!(report.playlist.as_deref(), Some("OK Computer Mix"));
        assert_eq!(report.matched, 2);
        assert_eq!(report.synced, 2);
        assert!(report.errors.is_empty());
        assert_eq!(
            *library.playlists.lock(),
            vec![(
                "OK Computer Mix".to_string(),
                vec!["plex-karma-police".to_string(), "plex-creep".to_string()]
            )]
        );
        assert_eq!(&steps[steps.len() - 2..], &[SyncStep::UpdatingPlaylist, SyncStep::Complete]);
    }

    #[tokio::test]
    async fn test_playlist_write_failure_is_reported() {
        let library = MockLibrary::with_candidates(vec![candidate("Creep", "Radiohead", Some(238_000))])
            .with_playlist_result(Err(BackendError::Status {
                status: 401,
                endpoint: "playlists".into(),
            }));
        let service = service(library, None, MockSearchBackend::default());
        let tracks = vec![source_track("Creep", &["Radiohead"], 238_000)];

        let report = service
            .sync_playlist("Mix", &tracks, false, &CancelFlag::new(), |_| Ok(()))
            .await;

        assert_eq!(report.matched, 1);
        assert_eq!(report.synced, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Failed to update playlist 'Mix'"));
    }

    #[tokio::test]
    async fn test_playlist_not_written_counts_nothing_synced() {
        let library = MockLibrary::with_candidates(vec![candidate("Creep", "Radiohead", Some(238_000))])
            .with_playlist_result(Ok(false));
        let service = service(library, None, MockSearchBackend::default());
        let tracks = vec![source_track("Creep", &["Radiohead"], 238_000)];

        let report = service
            .sync_playlist("Mix", &tracks, false, &CancelFlag::new(), |_| Ok(()))
            .await;

        assert_eq!(report.synced, 0);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_plain_sync_leaves_playlists_alone() {
        let library = Arc::new(MockLibrary::with_candidates(vec![candidate("Creep", "Radiohead", Some(238_000))]));
        let service = SyncService::new(
            library.clone(),
            None,
            Arc::new(MockSearchBackend::default()),
            settings(),
        );

        let report = service
            .sync(&[source_track("Creep", &["Radiohead"], 238_000)], false, &CancelFlag::new(), |_| Ok(()))
            .await;

        assert_eq!(report.matched, 1);
        assert_eq!(report.synced, 0);
        assert!(report.playlist.is_none());
        assert!(library.playlists.lock().is_empty());
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::default();
        let settings = SyncSettings::from_config(&config);
        assert_eq!(settings, SyncSettings::default());
    }
}
