//! File quality labels and ranking scores for peer search results.
//!
//! # Quality Score
//!
//! ```text
//! base    codec weight: flac 1.0, mp3 0.8, ogg 0.7, aac 0.6, wma 0.5, other 0.3
//! +0.2    bitrate >= 320      (tracks only)
//! +0.1    bitrate >= 256      (tracks only)
//! -0.2    bitrate <  128      (tracks only)
//! +0.1    8..=20 tracks, +0.05 above 20   (albums only)
//! +0.1    peer has a free upload slot
//! +0.05   peer upload speed > 100
//! -0.1    peer queue longer than 10
//! ```
//!
//! Track scores are capped at 1.0; album scores are not.

use serde::{Deserialize, Serialize};

/// Extensions accepted as audio files.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "aac", "wma", "wav", "m4a"];

/// Codec-derived quality label of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Flac,
    Mp3,
    Ogg,
    Aac,
    Wma,
    Unknown,
}

impl AudioQuality {
    /// Map a lowercase extension to its label. Audio formats without a
    /// dedicated label (wav, m4a) are `Unknown`.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "flac" => Self::Flac,
            "mp3" => Self::Mp3,
            "ogg" => Self::Ogg,
            "aac" => Self::Aac,
            "wma" => Self::Wma,
            _ => Self::Unknown,
        }
    }

    /// Base ranking weight.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Flac => 1.0,
            Self::Mp3 => 0.8,
            Self::Ogg => 0.7,
            Self::Aac => 0.6,
            Self::Wma => 0.5,
            Self::Unknown => 0.3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Aac => "aac",
            Self::Wma => "wma",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transfer health reported by the peer offering a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerStats {
    pub free_upload_slots: u32,
    /// Upload speed in the backend's units
    pub upload_speed: u64,
    pub queue_length: u32,
}

impl PeerStats {
    /// Score adjustment for this peer's availability.
    pub fn adjustment(&self) -> f64 {
        let mut delta = 0.0;
        if self.free_upload_slots > 0 {
            delta += 0.1;
        }
        if self.upload_speed > 100 {
            delta += 0.05;
        }
        if self.queue_length > 10 {
            delta -= 0.1;
        }
        delta
    }
}

/// Score adjustment for a bitrate in kbps. Missing or zero bitrates are
/// neutral.
pub fn bitrate_adjustment(bitrate: Option<u32>) -> f64 {
    match bitrate {
        Some(b) if b >= 320 => 0.2,
        Some(b) if b >= 256 => 0.1,
        Some(b) if b > 0 && b < 128 => -0.2,
        _ => 0.0,
    }
}

/// Ranking score of a single file, capped at 1.0.
pub fn track_score(quality: AudioQuality, bitrate: Option<u32>, peer: &PeerStats) -> f64 {
    let score = quality.weight() + bitrate_adjustment(bitrate) + peer.adjustment();
    score.min(1.0)
}

/// Ranking score of an album folder. Not capped.
pub fn album_score(dominant: AudioQuality, track_count: usize, peer: &PeerStats) -> f64 {
    let completeness = if (8..=20).contains(&track_count) {
        0.1
    } else if track_count > 20 {
        0.05
    } else {
        0.0
    };
    dominant.weight() + completeness + peer.adjustment()
}
