//! Spotify Web API integration
//!
//! Uses a bearer token taken from configuration. Obtaining or refreshing
//! that token is left to the user.

mod adapter;
mod client;
pub mod dto;

pub use adapter::{page_tracks, to_source_track};
pub use client::SpotifyClient;
