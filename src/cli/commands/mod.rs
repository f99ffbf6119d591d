//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `score`: offline match scoring of one track pair
//! - `search`: progressive peer search
//! - `scan`: debounced or forced library scans
//! - `sync`: playlist matching and download-missing
//! - `cache`: match cache maintenance
//! - `config`: config file management

mod cache;
mod config;
mod scan;
mod score;
mod search;
mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;

use crate::backends::plex::PlexClient;
use crate::backends::slskd::SlskdClient;
use crate::backends::spotify::SpotifyClient;
use crate::config::Config;
use crate::db::{self, SqliteMatchCache};
use crate::scan::{ScanDebounceController, ScanSettings};

pub use cache::{cmd_cache_lookup, cmd_cache_refresh};
pub use config::{cmd_config_init, cmd_config_show};
pub use scan::cmd_scan;
pub use score::{ScoreArgs, cmd_score};
pub use search::cmd_search;
pub use sync::{SyncArgs, cmd_sync};

/// Spotify to Plex library sync with Soulseek downloads
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Plex token (overrides the config file)
    #[arg(long, env = "PLEX_TOKEN", global = true, hide_env_values = true)]
    pub plex_token: Option<String>,

    /// slskd API key (overrides the config file)
    #[arg(long, env = "SLSKD_API_KEY", global = true, hide_env_values = true)]
    pub slskd_api_key: Option<String>,

    /// Spotify access token (overrides the config file)
    #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub spotify_token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Score one catalog track against one library candidate (offline)
    Score(ScoreArgs),
    /// Search the Soulseek network
    Search {
        /// Free-text query, e.g. "queen bohemian rhapsody"
        query: String,
        /// Search duration in seconds (defaults to the configured timeout)
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Number of tracks and albums to list
        #[arg(long, default_value = "10")]
        top: usize,
    },
    /// Request a Plex library scan
    Scan {
        /// Scan now instead of waiting out the debounce delay
        #[arg(long)]
        force: bool,
        /// Wait until the scan has finished
        #[arg(long)]
        wait: bool,
    },
    /// Match tracks against Plex and optionally download what is missing
    Sync(SyncArgs),
    /// Maintain the persisted match cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Reload every Plex music track into the cache
    Refresh,
    /// Look up one track in the cache
    Lookup {
        #[arg(long)]
        title: String,
        #[arg(long)]
        artist: String,
        /// Minimum cache confidence (defaults to the configured threshold)
        #[arg(long)]
        threshold: Option<f64>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write the current settings (including overrides) to the config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command was
/// specified.
pub fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    let Some(command) = &cli.command else {
        return Ok(false);
    };

    let rt = Runtime::new()?;
    let config = effective_config(cli);

    match command {
        Commands::Score(args) => cmd_score(args)?,
        Commands::Search { query, timeout, top } => cmd_search(&rt, &config, query, *timeout, *top)?,
        Commands::Scan { force, wait } => cmd_scan(&rt, &config, *force, *wait)?,
        Commands::Sync(args) => cmd_sync(&rt, &config, args)?,
        Commands::Cache { action } => match action {
            CacheAction::Refresh => cmd_cache_refresh(&rt, &config)?,
            CacheAction::Lookup {
                title,
                artist,
                threshold,
            } => cmd_cache_lookup(&rt, &config, title, artist, *threshold)?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => cmd_config_init(&rt, config, *force)?,
            ConfigAction::Show => cmd_config_show(&config)?,
        },
    }
    Ok(true)
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Config file settings with command-line overrides applied
fn effective_config(cli: &Cli) -> Config {
    let mut config = crate::config::load();
    if let Some(token) = &cli.plex_token {
        config.credentials.plex_token = Some(token.clone());
    }
    if let Some(key) = &cli.slskd_api_key {
        config.credentials.slskd_api_key = Some(key.clone());
    }
    if let Some(token) = &cli.spotify_token {
        config.credentials.spotify_access_token = Some(token.clone());
    }
    config
}

pub(crate) fn plex_client(config: &Config) -> PlexClient {
    PlexClient::new(
        config.plex.base_url.clone(),
        config.credentials.plex_token.clone(),
        config.plex.music_section.clone(),
    )
}

pub(crate) fn slskd_client(config: &Config) -> SlskdClient {
    SlskdClient::new(config.soulseek.base_url.clone(), config.credentials.slskd_api_key.clone())
}

pub(crate) fn spotify_client(config: &Config) -> SpotifyClient {
    SpotifyClient::new(config.credentials.spotify_access_token.clone())
}

pub(crate) async fn open_cache(config: &Config) -> anyhow::Result<SqliteMatchCache> {
    let pool = db::init_db(&config.database.url()).await?;
    Ok(SqliteMatchCache::new(pool))
}

/// Scan controller for the configured Plex server, running on the current
/// runtime.
pub(crate) fn scan_controller(config: &Config) -> ScanDebounceController {
    let settings = ScanSettings {
        debounce: config.scan.debounce(),
        section: config.plex.music_section.clone(),
        ..Default::default()
    };
    ScanDebounceController::new(Arc::new(plex_client(config)), settings, tokio::runtime::Handle::current())
}

/// Resolve a path relative to the working directory for display
pub(crate) fn display_path(path: &std::path::Path) -> PathBuf {
    std::env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
