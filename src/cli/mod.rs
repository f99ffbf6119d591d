//! Command-line interface for soulsync.
//!
//! Each subcommand drives one part of the library: offline match scoring,
//! peer searches, library scans, playlist sync and the match cache.

mod commands;

pub use commands::{Cli, Commands, run_command};
