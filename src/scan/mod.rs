//! Debounced media-server library scans.
//!
//! Downloads tend to finish in bursts, and every finished download wants
//! the media server to pick it up. [`ScanDebounceController`] coalesces
//! those requests into as few library scans as possible.
//!
//! # State machine
//!
//! ```text
//!            request_scan                timer fires / force_scan
//!   Idle ─────────────────▶ Pending ─────────────────────────────▶ InProgress
//!    ▲                       │  ▲                                     │
//!    │                       └──┘ request_scan re-arms the timer      │
//!    │                                                                │
//!    └──── trigger refused, or scan observed finished / timed out ────┘
//! ```
//!
//! A request arriving while a scan is in progress sets `rescan_needed`;
//! when that scan completes exactly one follow-up request is issued.
//!
//! All state lives behind a single `parking_lot::Mutex` that is never held
//! across an `.await` or while completion callbacks run, so callbacks may
//! call back into the controller.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::backends::traits::LibraryApi;
use crate::error::CallbackResult;

/// Invoked once each time a library scan is considered finished.
pub trait ScanCompletionCallback: Send + Sync {
    fn on_scan_complete(&self) -> CallbackResult;
}

impl<F> ScanCompletionCallback for F
where
    F: Fn() -> CallbackResult + Send + Sync,
{
    fn on_scan_complete(&self) -> CallbackResult {
        self()
    }
}

/// Timing and target of the controlled scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Quiet period between the last request and the scan
    pub debounce: Duration,
    /// Wait after triggering before the first status poll
    pub grace_period: Duration,
    pub poll_interval: Duration,
    /// A scan running longer than this is assumed finished
    pub max_duration: Duration,
    /// Library section polled for scan status
    pub section: String,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(60),
            grace_period: Duration::from_secs(15),
            poll_interval: Duration::from_secs(30),
            max_duration: Duration::from_secs(1800),
            section: "Music".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    /// Debounce timer armed
    Pending,
    /// Remote scan triggered and being monitored
    InProgress,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
        })
    }
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStatus {
    pub phase: ScanPhase,
    pub rescan_needed: bool,
    pub timer_active: bool,
    pub delay: Duration,
    pub callbacks: usize,
}

impl ScanStatus {
    pub fn scan_in_progress(&self) -> bool {
        self.phase == ScanPhase::InProgress
    }
}

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

struct State {
    phase: ScanPhase,
    timer: Option<ArmedTimer>,
    next_generation: u64,
    rescan_needed: bool,
    started_at: Option<Instant>,
    callbacks: Vec<Arc<dyn ScanCompletionCallback>>,
}

struct Inner {
    library: Arc<dyn LibraryApi>,
    settings: ScanSettings,
    runtime: Handle,
    state: Mutex<State>,
}

/// Coalesces scan requests into debounced, monitored library scans.
///
/// Cheap to clone; clones share one state machine.
#[derive(Clone)]
pub struct ScanDebounceController {
    inner: Arc<Inner>,
}

impl ScanDebounceController {
    /// Timers and monitoring run as tasks on `runtime`.
    pub fn new(library: Arc<dyn LibraryApi>, settings: ScanSettings, runtime: Handle) -> Self {
        tracing::info!(
            target: "scan",
            debounce_secs = settings.debounce.as_secs(),
            section = %settings.section,
            "Scan controller initialized"
        );
        Self {
            inner: Arc::new(Inner {
                library,
                settings,
                runtime,
                state: Mutex::new(State {
                    phase: ScanPhase::Idle,
                    timer: None,
                    next_generation: 0,
                    rescan_needed: false,
                    started_at: None,
                    callbacks: Vec::new(),
                }),
            }),
        }
    }

    /// Ask for a library scan once things have been quiet for the debounce
    /// delay. Re-arms the timer if one is already pending.
    pub fn request_scan(&self, reason: &str) {
        let mut state = self.inner.state.lock();

        if state.phase == ScanPhase::InProgress {
            state.rescan_needed = true;
            tracing::info!(target: "scan", reason, "Scan in progress, queueing follow-up scan");
            return;
        }

        match state.timer.take() {
            Some(timer) => {
                timer.handle.abort();
                tracing::debug!(target: "scan", reason, "Resetting scan timer");
            }
            None => tracing::info!(
                target: "scan",
                reason,
                delay_secs = self.inner.settings.debounce.as_secs(),
                "Scan queued"
            ),
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let delay = self.inner.settings.debounce;
        let controller = self.clone();
        let handle = self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            controller.on_timer_fired(generation).await;
        });

        state.timer = Some(ArmedTimer { generation, handle });
        state.phase = ScanPhase::Pending;
    }

    /// Scan now, skipping the debounce wait. Does nothing if a scan is
    /// already running.
    pub async fn force_scan(&self) {
        let begun = {
            let mut state = self.inner.state.lock();
            if let Some(timer) = state.timer.take() {
                timer.handle.abort();
            }
            if state.phase == ScanPhase::InProgress {
                tracing::warn!(target: "scan", "Force scan requested but a scan is already in progress");
                return;
            }
            Self::begin(&mut state)
        };

        if begun {
            tracing::info!(target: "scan", "Force scan requested, executing immediately");
            self.run_scan().await;
        }
    }

    /// Register a completion callback. Returns `false` if it was already
    /// registered.
    pub fn add_completion_callback(&self, callback: Arc<dyn ScanCompletionCallback>) -> bool {
        let mut state = self.inner.state.lock();
        if state.callbacks.iter().any(|c| Arc::ptr_eq(c, &callback)) {
            return false;
        }
        state.callbacks.push(callback);
        tracing::debug!(target: "scan", total = state.callbacks.len(), "Added scan completion callback");
        true
    }

    /// Unregister a completion callback. Returns `false` if it was not
    /// registered.
    pub fn remove_completion_callback(&self, callback: &Arc<dyn ScanCompletionCallback>) -> bool {
        let mut state = self.inner.state.lock();
        let before = state.callbacks.len();
        state.callbacks.retain(|c| !Arc::ptr_eq(c, callback));
        before != state.callbacks.len()
    }

    pub fn get_status(&self) -> ScanStatus {
        let state = self.inner.state.lock();
        ScanStatus {
            phase: state.phase,
            rescan_needed: state.rescan_needed,
            timer_active: state.timer.is_some(),
            delay: self.inner.settings.debounce,
            callbacks: state.callbacks.len(),
        }
    }

    /// Cancel any pending timer. A scan already in progress keeps running
    /// and is still monitored to completion.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock();
        if let Some(timer) = state.timer.take() {
            timer.handle.abort();
            tracing::info!(target: "scan", "Shutdown cancelled pending scan");
        }
        if state.phase == ScanPhase::Pending {
            state.phase = ScanPhase::Idle;
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    async fn on_timer_fired(&self, generation: u64) {
        let begun = {
            let mut state = self.inner.state.lock();
            match &state.timer {
                Some(timer) if timer.generation == generation => state.timer = None,
                // Superseded by a newer request or cancelled
                _ => return,
            }
            Self::begin(&mut state)
        };

        if begun {
            self.run_scan().await;
        }
    }

    /// Enter `InProgress`. Callers hold the lock.
    fn begin(state: &mut State) -> bool {
        if state.phase == ScanPhase::InProgress {
            tracing::warn!(target: "scan", "Scan already in progress, skipping duplicate execution");
            return false;
        }
        state.phase = ScanPhase::InProgress;
        state.rescan_needed = false;
        state.started_at = Some(Instant::now());
        true
    }

    async fn run_scan(&self) {
        tracing::info!(target: "scan", "Starting library scan");

        let accepted = match self.inner.library.trigger_library_scan().await {
            Ok(true) => true,
            Ok(false) => {
                tracing::error!(target: "scan", "Library refused the scan request");
                false
            }
            Err(e) => {
                tracing::error!(target: "scan", error = %e, "Failed to trigger library scan");
                false
            }
        };

        if accepted {
            tracing::info!(target: "scan", "Library scan initiated");
            let controller = self.clone();
            self.inner.runtime.spawn(async move { controller.monitor().await });
            return;
        }

        let retry = {
            let mut state = self.inner.state.lock();
            state.phase = ScanPhase::Idle;
            state.started_at = None;
            std::mem::take(&mut state.rescan_needed)
        };
        // Requests that arrived while the trigger call was in flight
        if retry {
            self.request_scan("Retry for requests made during failed scan");
        }
    }

    async fn monitor(&self) {
        let settings = &self.inner.settings;
        tokio::time::sleep(settings.grace_period).await;

        loop {
            let elapsed = {
                let state = self.inner.state.lock();
                if state.phase != ScanPhase::InProgress {
                    tracing::debug!(target: "scan", "Scan no longer in progress, stopping monitor");
                    return;
                }
                state.started_at.map(|t| t.elapsed()).unwrap_or_default()
            };

            if elapsed > settings.max_duration {
                tracing::warn!(
                    target: "scan",
                    max_secs = settings.max_duration.as_secs(),
                    "Scan timeout reached, assuming completion"
                );
                break;
            }

            match self.inner.library.is_library_scanning(&settings.section).await {
                Ok(true) => {
                    tracing::debug!(target: "scan", "Library still scanning");
                    tokio::time::sleep(settings.poll_interval).await;
                }
                Ok(false) => {
                    tracing::info!(target: "scan", elapsed_secs = elapsed.as_secs_f64(), "Library scan finished");
                    break;
                }
                Err(e) => {
                    tracing::error!(target: "scan", error = %e, "Scan status poll failed, assuming completion");
                    break;
                }
            }
        }

        self.complete();
    }

    fn complete(&self) {
        let (callbacks, follow_up) = {
            let mut state = self.inner.state.lock();
            if state.phase != ScanPhase::InProgress {
                tracing::debug!(target: "scan", "Completion called but no scan was in progress");
                return;
            }
            state.phase = ScanPhase::Idle;
            state.started_at = None;
            (state.callbacks.clone(), std::mem::take(&mut state.rescan_needed))
        };

        tracing::info!(target: "scan", callbacks = callbacks.len(), "Library scan completed");
        for (index, callback) in callbacks.iter().enumerate() {
            if let Err(e) = callback.on_scan_complete() {
                tracing::error!(target: "scan", index, error = %e, "Scan completion callback failed");
            }
        }

        if follow_up {
            tracing::info!(target: "scan", "Downloads occurred during scan, triggering follow-up");
            self.request_scan("Follow-up scan for downloads during previous scan");
        }
    }
}
