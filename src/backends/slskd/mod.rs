//! slskd integration
//!
//! slskd is a Soulseek client daemon with a REST API. All calls go to
//! `{base_url}/api/v0/` and authenticate with an `X-API-Key` header.
//! API docs: https://github.com/slskd/slskd/blob/master/docs/api.md

mod adapter;
mod client;
pub mod dto;

pub use adapter::{to_download_statuses, to_raw_responses};
pub use client::SlskdClient;
