//! Adapter layer: Convert slskd DTOs to domain models
//!
//! This is the ONLY place where slskd DTO types are converted to domain types.

use super::dto;
use crate::model::DownloadStatus;
use crate::search::{RawFile, RawSearchResponse};

/// Convert search responses to raw peer listings
pub fn to_raw_responses(responses: Vec<dto::PeerResponse>) -> Vec<RawSearchResponse> {
    responses.into_iter().map(to_raw_response).collect()
}

fn to_raw_response(response: dto::PeerResponse) -> RawSearchResponse {
    let free_upload_slots = match (response.free_upload_slots, response.has_free_upload_slot) {
        (Some(slots), _) => slots,
        (None, Some(true)) => 1,
        _ => 0,
    };

    RawSearchResponse {
        username: response.username,
        free_upload_slots,
        upload_speed: response.upload_speed,
        queue_length: u32::try_from(response.queue_length).unwrap_or(u32::MAX),
        files: response
            .files
            .into_iter()
            .map(|f| RawFile {
                filename: f.filename,
                size: f.size,
                bitrate: f.bit_rate,
                length: f.length,
            })
            .collect(),
    }
}

/// Flatten the user/directory/file transfer tree
pub fn to_download_statuses(users: Vec<dto::UserTransfers>) -> Vec<DownloadStatus> {
    users
        .into_iter()
        .flat_map(|user| {
            let username = user.username;
            user.directories
                .into_iter()
                .flat_map(|dir| dir.files)
                .map(move |transfer| to_download_status(&username, transfer))
        })
        .collect()
}

fn to_download_status(username: &str, transfer: dto::Transfer) -> DownloadStatus {
    let progress = if transfer.state.to_lowercase().starts_with("completed") {
        100.0
    } else {
        transfer.percent_complete
    };

    DownloadStatus {
        id: transfer.id,
        filename: transfer.filename,
        username: username.to_string(),
        state: transfer.state,
        progress,
        size: transfer.size,
    }
}

/// Download id from the enqueue reply, which may be an object, a list or
/// nothing at all.
pub(super) fn download_id(reply: &serde_json::Value) -> Option<String> {
    let id = match reply {
        serde_json::Value::Array(items) => items.first()?.get("id")?,
        other => other.get("id")?,
    };
    match id {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
