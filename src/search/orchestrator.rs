//! Progressive peer search.
//!
//! A search is submitted once and then polled every 1.5 seconds. Each poll
//! returns the cumulative response list; only responses not seen before are
//! parsed and aggregated, merged into the running results and re-sorted.
//! The loop ends when 30 or more peers have answered, when the poll budget
//! (`timeout / 1.5s`) is spent, or when the caller cancels.
//!
//! Backend failures never escape: a failed submit yields empty results, a
//! failed poll is logged and the next poll proceeds.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::album::{AlbumResult, aggregate};
use super::parser::{TrackResult, parse_response};
use crate::backends::traits::SearchBackend;
use crate::error::CallbackResult;

/// Time between polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Stop polling once this many peers have responded.
pub const RESPONSE_LIMIT: usize = 30;

/// Caller-settable flag checked between polls.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Snapshot handed to the progress callback after each batch.
#[derive(Debug, Clone, Copy)]
pub struct SearchProgress<'a> {
    /// All individual tracks so far, best first
    pub tracks: &'a [TrackResult],
    /// All albums so far, best first
    pub albums: &'a [AlbumResult],
    /// Peers that have responded so far
    pub response_count: usize,
}

/// Final outcome of one search session.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub tracks: Vec<TrackResult>,
    pub albums: Vec<AlbumResult>,
    pub response_count: usize,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.albums.is_empty()
    }
}

/// Drives searches against a [`SearchBackend`].
///
/// Holds no per-search state; every call to [`search`](Self::search) starts
/// a fresh session, so one orchestrator can run concurrent searches.
#[derive(Clone)]
pub struct SearchOrchestrator {
    backend: Arc<dyn SearchBackend>,
}

impl SearchOrchestrator {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Search without progress reporting or cancellation.
    pub async fn search_all(&self, query: &str, timeout: Duration) -> SearchResults {
        self.search(query, timeout, &CancelFlag::new(), |_| Ok(())).await
    }

    /// Run one progressive search.
    ///
    /// `on_progress` is called after every poll that brought new responses.
    /// An `Err` from it is logged and polling continues.
    pub async fn search<F>(&self, query: &str, timeout: Duration, cancel: &CancelFlag, mut on_progress: F) -> SearchResults
    where
        F: FnMut(SearchProgress<'_>) -> CallbackResult + Send,
    {
        tracing::info!(target: "search", query, timeout_secs = timeout.as_secs_f64(), "Starting search");

        let search_id = match self.backend.submit_search(query, timeout).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(target: "search", query, error = %e, "Search submission failed");
                return SearchResults::default();
            }
        };

        let max_polls = (timeout.as_secs_f64() / POLL_INTERVAL.as_secs_f64()).floor() as u32;
        let mut results = SearchResults::default();

        for attempt in 0..max_polls {
            if cancel.is_cancelled() {
                tracing::info!(target: "search", query, attempt, "Search cancelled");
                break;
            }

            match self.backend.get_responses(&search_id).await {
                Ok(responses) if responses.len() > results.response_count => {
                    let new = &responses[results.response_count..];
                    tracing::debug!(
                        target: "search",
                        new = new.len(),
                        total = responses.len(),
                        attempt,
                        "New responses"
                    );
                    merge_batch(&mut results, new);
                    results.response_count = responses.len();

                    let progress = SearchProgress {
                        tracks: &results.tracks,
                        albums: &results.albums,
                        response_count: results.response_count,
                    };
                    if let Err(e) = on_progress(progress) {
                        tracing::error!(target: "search", error = %e, "Progress callback failed");
                    }

                    if results.response_count >= RESPONSE_LIMIT {
                        tracing::info!(
                            target: "search",
                            responses = results.response_count,
                            "Enough responses, stopping early"
                        );
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(target: "search", attempt, error = %e, "Polling search responses failed");
                }
            }

            if attempt + 1 < max_polls {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }

        tracing::info!(
            target: "search",
            query,
            tracks = results.tracks.len(),
            albums = results.albums.len(),
            responses = results.response_count,
            "Search finished"
        );
        results
    }
}

fn merge_batch(results: &mut SearchResults, responses: &[super::RawSearchResponse]) {
    let parsed: Vec<TrackResult> = responses.iter().flat_map(parse_response).collect();
    let (tracks, albums) = aggregate(parsed);

    results.tracks.extend(tracks);
    results.albums.extend(albums);
    results
        .tracks
        .sort_by(|a, b| b.quality_score().total_cmp(&a.quality_score()));
    results
        .albums
        .sort_by(|a, b| b.quality_score().total_cmp(&a.quality_score()));
}
