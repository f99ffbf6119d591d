//! Plex Media Server integration
//!
//! Talks to the server's HTTP API directly, asking for JSON with
//! `Accept: application/json` and authenticating with `X-Plex-Token`.

mod adapter;
mod client;
pub mod dto;

pub use adapter::{find_music_section, to_candidates};
pub use client::PlexClient;
