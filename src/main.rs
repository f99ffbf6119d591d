//! soulsync - keep a Plex music library in step with Spotify.
//!
//! Matches catalog tracks against the library, finds missing ones on the
//! Soulseek network through slskd, and coalesces the resulting library
//! rescans. Everything is driven from the command line.

pub mod backends;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod matching;
pub mod model;
pub mod scan;
pub mod search;
pub mod sync;
#[cfg(test)]
pub mod test_utils;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log directives used when `RUST_LOG` is unset. Events use short
/// per-subsystem targets, so each one is named here.
const DEFAULT_LOG_DIRECTIVES: &str = "warn,soulsync=info,scan=info,search=info,sync=info,matching=info,db=info,backend=info";

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(log_filter())
        .init();

    if !cli::run_command(&args)? {
        cli::Cli::command().print_help()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    fn with_default_filter<T>(f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::registry().with(EnvFilter::new(DEFAULT_LOG_DIRECTIVES));
        tracing::subscriber::with_default(subscriber, f)
    }

    #[test]
    fn test_default_filter_enables_subsystem_targets() {
        with_default_filter(|| {
            assert!(tracing::enabled!(target: "scan", Level::ERROR));
            assert!(tracing::enabled!(target: "scan", Level::INFO));
            assert!(tracing::enabled!(target: "search", Level::ERROR));
            assert!(tracing::enabled!(target: "sync", Level::INFO));
            assert!(tracing::enabled!(target: "matching", Level::INFO));
            assert!(tracing::enabled!(target: "db", Level::INFO));
            assert!(tracing::enabled!(target: "backend::slskd", Level::WARN));
            assert!(tracing::enabled!(target: "backend::plex", Level::INFO));
        });
    }

    #[test]
    fn test_default_filter_quiets_dependencies() {
        with_default_filter(|| {
            assert!(!tracing::enabled!(target: "sqlx::query", Level::INFO));
            assert!(!tracing::enabled!(target: "scan", Level::DEBUG));
            assert!(tracing::enabled!(target: "reqwest", Level::WARN));
        });
    }
}
