//! Progressive Soulseek search.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;

use crate::config::Config;
use crate::search::{CancelFlag, SearchOrchestrator};

use super::slskd_client;

/// Search, printing each batch as it arrives and the best results at the end
pub fn cmd_search(rt: &Runtime, config: &Config, query: &str, timeout: Option<u64>, top: usize) -> anyhow::Result<()> {
    let timeout = timeout.map(Duration::from_secs).unwrap_or_else(|| config.search.timeout());

    rt.block_on(async {
        let orchestrator = SearchOrchestrator::new(Arc::new(slskd_client(config)));
        let cancel = CancelFlag::new();

        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });

        println!("Searching for \"{}\" ({}s)...", query, timeout.as_secs());
        let results = orchestrator
            .search(query, timeout, &cancel, |progress| {
                println!(
                    "  {} peers: {} tracks, {} albums",
                    progress.response_count,
                    progress.tracks.len(),
                    progress.albums.len()
                );
                Ok(())
            })
            .await;

        if results.is_empty() {
            println!("No results.");
            return;
        }

        println!("\nTop tracks:");
        for track in results.tracks.iter().take(top) {
            println!(
                "  [{:.2}] {} - {} ({}, {} MB) from {}",
                track.quality_score(),
                track.artist.as_deref().unwrap_or("?"),
                track.title,
                track.quality,
                track.size / (1024 * 1024),
                track.username
            );
        }

        if !results.albums.is_empty() {
            println!("\nTop albums:");
            for album in results.albums.iter().take(top) {
                println!(
                    "  [{:.2}] {} - {}{} ({} tracks, {}, {} MB) from {}",
                    album.quality_score(),
                    album.artist.as_deref().unwrap_or("?"),
                    album.album_title,
                    album.year.map(|y| format!(" ({})", y)).unwrap_or_default(),
                    album.track_count,
                    album.dominant_quality,
                    album.size_mb(),
                    album.username
                );
            }
        }
    });
    Ok(())
}
