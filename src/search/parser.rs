//! Peer file listings to single-track results.
//!
//! Peers rarely tag their files, so artist, title, track number and album
//! are inferred from the path. Filename patterns are tried in order and the
//! first one that matches wins:
//!
//! ```text
//! "01 - Artist - Title"   track number, artist, title
//! "Artist - Title"        artist, title ("07 - Title" gives number, title)
//! "01. Title"             track number, title
//! ```

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::quality::{AUDIO_EXTENSIONS, AudioQuality, PeerStats, track_score};
use crate::matching::Candidate;

static NUMBER_ARTIST_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s*[-\.]\s*(.+?)\s*[-–]\s*(.+)$").expect("valid regex"));
static ARTIST_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*[-–]\s*(.+)$").expect("valid regex"));
static NUMBER_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s*[-\.]\s*(.+)$").expect("valid regex"));
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s*[-\.]\s*").expect("valid regex"));

/// One file record in a peer's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    /// Full path as shared by the peer, either separator style
    pub filename: String,
    /// Size in bytes
    pub size: u64,
    /// Bitrate in kbps
    pub bitrate: Option<u32>,
    /// Length in seconds
    pub length: Option<u32>,
}

/// One peer's file listing for a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSearchResponse {
    pub username: String,
    pub free_upload_slots: u32,
    pub upload_speed: u64,
    pub queue_length: u32,
    pub files: Vec<RawFile>,
}

impl RawSearchResponse {
    pub fn peer_stats(&self) -> PeerStats {
        PeerStats {
            free_upload_slots: self.free_upload_slots,
            upload_speed: self.upload_speed,
            queue_length: self.queue_length,
        }
    }
}

/// A downloadable audio file with inferred metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackResult {
    /// Peer offering the file
    pub username: String,
    /// Full path as shared by the peer; needed verbatim to download
    pub filename: String,
    pub size: u64,
    pub bitrate: Option<u32>,
    /// Length in seconds
    pub duration_secs: Option<u32>,
    pub quality: AudioQuality,
    pub peer: PeerStats,
    pub artist: Option<String>,
    /// Inferred title, falling back to the filename stem
    pub title: String,
    pub album: Option<String>,
    pub track_number: Option<u32>,
}

impl TrackResult {
    /// Ranking score in `[0, 1]`.
    pub fn quality_score(&self) -> f64 {
        track_score(self.quality, self.bitrate, &self.peer)
    }
}

impl Candidate for TrackResult {
    fn title(&self) -> &str {
        &self.title
    }

    fn artist(&self) -> &str {
        self.artist.as_deref().unwrap_or_default()
    }

    fn duration_ms(&self) -> Option<u64> {
        self.duration_secs.map(|secs| u64::from(secs) * 1000)
    }
}

/// Parse every audio file in `response`, skipping anything else.
pub fn parse_response(response: &RawSearchResponse) -> Vec<TrackResult> {
    let peer = response.peer_stats();
    response
        .files
        .iter()
        .filter_map(|file| parse_file(&response.username, peer, file))
        .collect()
}

/// Parse one file record, or `None` if it is not an audio file.
pub fn parse_file(username: &str, peer: PeerStats, file: &RawFile) -> Option<TrackResult> {
    let path = file.filename.replace('\\', "/");
    let basename = path.rsplit('/').next().unwrap_or_default();

    let ext = Path::new(basename).extension()?.to_str()?.to_lowercase();
    if !AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    let stem = Path::new(basename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(basename);

    let inferred = infer_from_stem(stem);

    Some(TrackResult {
        username: username.to_string(),
        filename: file.filename.clone(),
        size: file.size,
        bitrate: file.bitrate,
        duration_secs: file.length,
        quality: AudioQuality::from_extension(&ext),
        peer,
        artist: inferred.artist,
        title: inferred.title.unwrap_or_else(|| stem.to_string()),
        album: album_from_path(&path),
        track_number: inferred.track_number,
    })
}

#[derive(Debug, Default)]
struct Inferred {
    artist: Option<String>,
    title: Option<String>,
    track_number: Option<u32>,
}

fn infer_from_stem(stem: &str) -> Inferred {
    let mut out = Inferred::default();

    if let Some(caps) = NUMBER_ARTIST_TITLE.captures(stem) {
        match caps[1].parse::<u32>() {
            Ok(n) => {
                out.track_number = Some(n);
                out.artist = non_empty(&caps[2]);
                out.title = non_empty(&caps[3]);
            }
            // Too large for a track number; keep it as the artist
            Err(_) => {
                out.artist = non_empty(&caps[1]);
                out.title = non_empty(&format!("{} - {}", &caps[2], &caps[3]));
            }
        }
    } else if let Some(caps) = ARTIST_TITLE.captures(stem) {
        let first = caps[1].trim();
        if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = first.parse::<u32>() {
                out.track_number = Some(n);
                out.title = non_empty(&caps[2]);
            }
        } else {
            out.artist = non_empty(first);
            out.title = non_empty(&caps[2]);
        }
    } else if let Some(caps) = NUMBER_TITLE.captures(stem) {
        if let Ok(n) = caps[1].parse::<u32>() {
            out.track_number = Some(n);
            out.title = non_empty(&caps[2]);
        }
    }

    out
}

/// Nearest usable ancestor directory, with any "NN - " prefix removed.
///
/// Hidden/system folders ('@...') and names of three characters or fewer
/// are skipped in favour of the next ancestor up.
fn album_from_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = path.split('/').collect();
    parts.pop()?;

    parts
        .into_iter()
        .rev()
        .filter(|part| !part.is_empty() && !part.starts_with('@'))
        .map(|part| LEADING_NUMBER.replace(part, "").into_owned())
        .find(|cleaned| cleaned.chars().count() > 3)
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
