//! Follows queued downloads until they finish.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::backends::traits::SearchBackend;
use crate::scan::ScanDebounceController;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60 * 60);

/// Where each watched download ended up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Still running when the deadline passed
    pub pending: Vec<String>,
}

/// Polls the download daemon and requests a library scan per finished file.
pub struct DownloadMonitor {
    backend: Arc<dyn SearchBackend>,
    poll_interval: Duration,
    deadline: Duration,
}

impl DownloadMonitor {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Watch `ids` until every one reaches a terminal state or the deadline
    /// passes.
    ///
    /// A download is recognised by its id or, for daemons that returned no
    /// id when queueing, by its filename. Every successful completion calls
    /// [`ScanDebounceController::request_scan`].
    pub async fn watch(&self, ids: &[String], scan: &ScanDebounceController) -> WatchOutcome {
        let mut pending: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut outcome = WatchOutcome::default();
        let started = Instant::now();

        tracing::info!(target: "sync", downloads = pending.len(), "Monitoring downloads");

        while !pending.is_empty() {
            match self.backend.get_downloads().await {
                Ok(statuses) => {
                    for status in statuses.iter().filter(|s| s.is_complete()) {
                        let key = if pending.contains(status.id.as_str()) {
                            status.id.as_str()
                        } else if pending.contains(status.filename.as_str()) {
                            status.filename.as_str()
                        } else {
                            continue;
                        };
                        let Some(watched) = pending.take(key) else {
                            continue;
                        };

                        if status.is_success() {
                            tracing::info!(target: "sync", file = %status.filename, "Download completed");
                            outcome.succeeded.push(watched.to_string());
                            scan.request_scan("Download completed");
                        } else {
                            tracing::warn!(target: "sync", file = %status.filename, state = %status.state, "Download failed");
                            outcome.failed.push(watched.to_string());
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "sync", error = %e, "Polling downloads failed");
                }
            }

            if pending.is_empty() {
                break;
            }
            if started.elapsed() >= self.deadline {
                tracing::warn!(target: "sync", remaining = pending.len(), "Download monitor deadline reached");
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        outcome.pending = ids
            .iter()
            .filter(|id| pending.contains(id.as_str()))
            .cloned()
            .collect();
        outcome
    }
}
