//! Match cache commands.

use tokio::runtime::Runtime;

use crate::config::Config;
use crate::db;

use super::{display_path, open_cache, plex_client};

/// Reload the cache from every track in the Plex music library
pub fn cmd_cache_refresh(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let cache = open_cache(config).await?;
        let plex = plex_client(config);

        println!("Fetching Plex music library...");
        let tracks = plex.all_tracks().await?;
        let written = cache.refresh(&tracks).await?;

        println!(
            "Cached {} tracks in {}",
            written,
            display_path(&config.database.path).display()
        );
        Ok(())
    })
}

/// Look up one track and print the best cached candidate
pub fn cmd_cache_lookup(
    rt: &Runtime,
    config: &Config,
    title: &str,
    artist: &str,
    threshold: Option<f64>,
) -> anyhow::Result<()> {
    let threshold = threshold.unwrap_or(config.matching.cache_threshold);

    rt.block_on(async {
        let cache = open_cache(config).await?;
        if db::count_tracks(cache.pool()).await? == 0 {
            println!("Cache is empty. Run `soulsync cache refresh` first.");
            return Ok(());
        }

        let (hit, confidence) = cache.lookup(title, artist, threshold).await?;
        match hit {
            Some(track) => println!(
                "Found: {} - {} [{}] (confidence {:.3})",
                track.artist, track.title, track.album, confidence
            ),
            None => println!("No match above {:.2} (best {:.3})", threshold, confidence),
        }
        Ok(())
    })
}
