//! Fuzzy track identity matching across catalogs.
//!
//! # Architecture
//!
//! - **normalize** - transliteration, case folding and noise stripping
//! - **similarity** - bounded string and duration similarity
//! - **confidence** - weighted confidence and descriptive tier
//! - **matcher** - best-candidate selection producing a [`MatchResult`]
//!
//! Every candidate source (live library, match cache, peer search result)
//! implements [`Candidate`], so the matcher only sees title, artist and
//! duration.
//!
//! # Usage
//!
//! ```ignore
//! use soulsync::matching::find_best_match;
//!
//! let result = find_best_match(&spotify_track, &plex_candidates);
//! if result.is_match() {
//!     println!("Already in library ({:.2})", result.confidence());
//! }
//! ```

pub mod confidence;
pub mod matcher;
pub mod normalize;
pub mod similarity;

pub use confidence::{MatchTier, ScoreBreakdown, confidence, score_breakdown};
pub use matcher::{MatchResult, find_best_match};
pub use normalize::{clean_artist, clean_title, normalize};
pub use similarity::{duration_similarity, edit_similarity, similarity};

use crate::model::CandidateTrack;

/// Minimum confidence for a match to count as "already have it".
pub const MATCH_THRESHOLD: f64 = 0.8;

/// The shape the matcher needs from any candidate track.
pub trait Candidate {
    fn title(&self) -> &str;
    fn artist(&self) -> &str;
    /// Duration in milliseconds, if known
    fn duration_ms(&self) -> Option<u64>;
}

impl Candidate for CandidateTrack {
    fn title(&self) -> &str {
        &self.title
    }

    fn artist(&self) -> &str {
        &self.artist
    }

    fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }
}
