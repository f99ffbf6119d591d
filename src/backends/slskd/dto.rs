//! slskd API Data Transfer Objects
//!
//! These types match what the slskd REST API sends and expects.
//! DO NOT use these types outside the slskd module - convert to domain types.
//!
//! Example search response:
//! ```json
//! [{
//!   "username": "peer",
//!   "freeUploadSlots": 1,
//!   "uploadSpeed": 1048576,
//!   "queueLength": 0,
//!   "files": [{"filename": "Music\\Album\\01 - Song.flac", "size": 31457280, "bitRate": 1411, "length": 215}]
//! }]
//! ```

use serde::{Deserialize, Serialize};

/// Body of `POST searches`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest<'a> {
    pub search_text: &'a str,
    /// Milliseconds
    pub timeout: u64,
    pub filter_responses: bool,
    pub minimum_response_file_count: u32,
    pub minimum_peer_upload_speed: u64,
}

/// Reply to `POST searches`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchCreated {
    pub id: Option<String>,
}

/// One peer's answer from `GET searches/{id}/responses`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerResponse {
    #[serde(default)]
    pub username: String,
    /// Newer daemons report a count
    pub free_upload_slots: Option<u32>,
    /// Older daemons report a flag
    pub has_free_upload_slot: Option<bool>,
    #[serde(default)]
    pub upload_speed: u64,
    #[serde(default)]
    pub queue_length: u64,
    #[serde(default)]
    pub files: Vec<PeerFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerFile {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    pub bit_rate: Option<u32>,
    /// Seconds
    pub length: Option<u32>,
}

/// Element of the `POST transfers/downloads/{username}` body
#[derive(Debug, Clone, Serialize)]
pub struct DownloadRequest<'a> {
    pub filename: &'a str,
    pub size: u64,
}

/// `GET transfers/downloads` groups transfers by user, then directory
#[derive(Debug, Clone, Deserialize)]
pub struct UserTransfers {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub directories: Vec<TransferDirectory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferDirectory {
    #[serde(default)]
    pub files: Vec<Transfer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub percent_complete: f64,
    #[serde(default)]
    pub size: u64,
}
