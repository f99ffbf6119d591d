//! Playlist sync command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tokio::runtime::Runtime;
use tokio::sync::Notify;

use crate::backends::traits::{CatalogApi, MatchCache};
use crate::config::Config;
use crate::error::CallbackResult;
use crate::model::{SourceTrack, tracks_from_json};
use crate::scan::{ScanCompletionCallback, ScanPhase};
use crate::search::CancelFlag;
use crate::sync::{DownloadMonitor, SyncProgress, SyncService, SyncSettings};

use super::{open_cache, plex_client, scan_controller, slskd_client, spotify_client};

#[derive(Args)]
pub struct SyncArgs {
    /// Spotify playlist id
    #[arg(long, conflicts_with = "tracks", required_unless_present = "tracks")]
    pub playlist: Option<String>,
    /// JSON file with an array of tracks ({id, title, artists, album, duration_ms})
    #[arg(long)]
    pub tracks: Option<PathBuf>,
    /// Search for and download tracks missing from Plex
    #[arg(long)]
    pub download: bool,
    /// After downloading, wait for the downloads and rescan Plex
    #[arg(long, requires = "download")]
    pub watch: bool,
    /// Skip the match cache and only query Plex
    #[arg(long)]
    pub no_cache: bool,
    /// Plex playlist to write the matched tracks to (defaults to the
    /// Spotify playlist's name)
    #[arg(long)]
    pub name: Option<String>,
    /// Only report matches, leave Plex playlists untouched
    #[arg(long, conflicts_with = "name")]
    pub no_playlist: bool,
}

pub fn cmd_sync(rt: &Runtime, config: &Config, args: &SyncArgs) -> anyhow::Result<()> {
    rt.block_on(async {
        let tracks = load_tracks(config, args).await?;
        let playlist = playlist_name(config, args).await;
        match &playlist {
            Some(name) => println!("Syncing {} tracks to playlist '{}'...", tracks.len(), name),
            None => println!("Syncing {} tracks...", tracks.len()),
        }

        let cache: Option<Arc<dyn MatchCache>> = if args.no_cache {
            None
        } else {
            match open_cache(config).await {
                Ok(cache) => Some(Arc::new(cache)),
                Err(e) => {
                    tracing::warn!(target: "sync", error = %e, "Match cache unavailable, using Plex only");
                    None
                }
            }
        };

        let backend = Arc::new(slskd_client(config));
        let service = SyncService::new(
            Arc::new(plex_client(config)),
            cache,
            backend.clone(),
            SyncSettings::from_config(config),
        );

        let cancel = CancelFlag::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });

        let print_progress = |progress: &SyncProgress| -> CallbackResult {
            if progress.current_track.is_empty() {
                println!("{} ({}/{} matched)", progress.step, progress.matched, progress.total);
            } else {
                println!("{}: {}", progress.step, progress.current_track);
            }
            Ok(())
        };
        let report = match &playlist {
            Some(name) => {
                service
                    .sync_playlist(name, &tracks, args.download, &cancel, print_progress)
                    .await
            }
            None => service.sync(&tracks, args.download, &cancel, print_progress).await,
        };

        println!();
        println!("Total:     {}", report.total);
        println!("Matched:   {} ({:.1}%)", report.matched, report.success_rate());
        if let Some(name) = &report.playlist {
            println!("Synced:    {} (playlist '{}')", report.synced, name);
        }
        println!("Missing:   {}", report.missing.len());
        for track in &report.missing {
            println!("  - {}", track.display_name());
        }
        if args.download {
            println!("Downloads: {}", report.downloads.len());
            println!("Failed:    {}", report.failed);
        }
        for error in &report.errors {
            eprintln!("Error: {}", error);
        }

        if args.watch && !report.downloads.is_empty() && !report.cancelled {
            let scan = scan_controller(config);
            let finished = Arc::new(Notify::new());
            let notify = finished.clone();
            let callback: Arc<dyn ScanCompletionCallback> = Arc::new(move || -> CallbackResult {
                notify.notify_one();
                Ok(())
            });
            scan.add_completion_callback(callback);

            println!("\nWaiting for {} downloads...", report.downloads.len());
            let outcome = DownloadMonitor::new(backend).watch(&report.downloads, &scan).await;
            println!(
                "Downloads finished: {} succeeded, {} failed, {} still running",
                outcome.succeeded.len(),
                outcome.failed.len(),
                outcome.pending.len()
            );

            if scan.get_status().phase != ScanPhase::Idle {
                println!("Waiting for the Plex scan to finish (Ctrl+C to stop)...");
                tokio::select! {
                    _ = finished.notified() => println!("Plex scan finished."),
                    _ = tokio::signal::ctrl_c() => println!("Stopped waiting."),
                }
            }
            scan.shutdown();
        }

        Ok(())
    })
}

async fn load_tracks(config: &Config, args: &SyncArgs) -> anyhow::Result<Vec<SourceTrack>> {
    if let Some(path) = &args.tracks {
        let contents = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(tracks_from_json(&contents)?);
    }

    let playlist = args.playlist.as_deref().context("Either --playlist or --tracks is required")?;
    let spotify = spotify_client(config);
    Ok(spotify.fetch_playlist_tracks(playlist).await?)
}

/// Plex playlist to write: `--name`, else the Spotify playlist's name.
async fn playlist_name(config: &Config, args: &SyncArgs) -> Option<String> {
    if args.no_playlist {
        return None;
    }
    if let Some(name) = &args.name {
        return Some(name.clone());
    }

    let playlist = args.playlist.as_deref()?;
    match spotify_client(config).fetch_playlist_name(playlist).await {
        Ok(name) => Some(name),
        Err(e) => {
            tracing::warn!(target: "sync", playlist, error = %e, "Could not read playlist name, skipping playlist update");
            None
        }
    }
}
