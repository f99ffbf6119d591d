//! Weighted match confidence between a catalog track and a candidate.
//!
//! # Scoring
//!
//! ```text
//! confidence = 0.5 * title + 0.3 * artist + 0.2 * duration
//! ```
//!
//! Identical cleaned titles lift the confidence to at least 0.85, and a
//! perfect tier lifts it to at least 0.98. The tier is descriptive only;
//! whether a match is *usable* is decided by [`super::MATCH_THRESHOLD`].

use serde::{Deserialize, Serialize};

use super::Candidate;
use super::normalize::{clean_artist, clean_title, normalize};
use super::similarity::{duration_similarity, similarity};
use crate::model::SourceTrack;

const TITLE_WEIGHT: f64 = 0.5;
const ARTIST_WEIGHT: f64 = 0.3;
const DURATION_WEIGHT: f64 = 0.2;

/// Floor applied when both cleaned titles are identical and non-empty.
pub const EXACT_TITLE_FLOOR: f64 = 0.85;
/// Floor applied to perfect-tier matches.
pub const PERFECT_MATCH_FLOOR: f64 = 0.98;

/// Categorical confidence bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    PerfectMatch,
    HighConfidence,
    MediumConfidence,
    LowConfidence,
    /// Candidates existed but none scored above zero
    NoMatch,
    /// There was nothing to compare against
    NoCandidates,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerfectMatch => "perfect_match",
            Self::HighConfidence => "high_confidence",
            Self::MediumConfidence => "medium_confidence",
            Self::LowConfidence => "low_confidence",
            Self::NoMatch => "no_match",
            Self::NoCandidates => "no_candidates",
        }
    }

    /// Bucket sub-scores; the first satisfied rule wins and every bound is
    /// strict.
    pub fn classify(title_score: f64, artist_score: f64, duration_score: f64) -> Self {
        if title_score > 0.95 && artist_score > 0.9 && duration_score > 0.9 {
            Self::PerfectMatch
        } else if title_score > 0.85 && artist_score > 0.8 {
            Self::HighConfidence
        } else if title_score > 0.75 {
            Self::MediumConfidence
        } else {
            Self::LowConfidence
        }
    }
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-scores behind a confidence value, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub title: f64,
    pub artist: f64,
    pub duration: f64,
    pub confidence: f64,
    pub tier: MatchTier,
}

/// Confidence and tier for `candidate` as a match for `source`.
pub fn confidence<C: Candidate + ?Sized>(source: &SourceTrack, candidate: &C) -> (f64, MatchTier) {
    let breakdown = score_breakdown(source, candidate);
    (breakdown.confidence, breakdown.tier)
}

/// Full scoring with every sub-score exposed.
pub fn score_breakdown<C: Candidate + ?Sized>(source: &SourceTrack, candidate: &C) -> ScoreBreakdown {
    let source_title = clean_title(&source.title);
    let candidate_title = clean_title(candidate.title());

    let artist = artist_score(&source.artists, candidate.artist());
    let title = similarity(&source_title, &candidate_title);
    let duration = duration_similarity(source.duration_ms, candidate.duration_ms().unwrap_or(0));

    let mut confidence = TITLE_WEIGHT * title + ARTIST_WEIGHT * artist + DURATION_WEIGHT * duration;

    if !source_title.is_empty() && source_title == candidate_title {
        confidence = confidence.max(EXACT_TITLE_FLOOR);
    }

    let tier = MatchTier::classify(title, artist, duration);
    if tier == MatchTier::PerfectMatch {
        confidence = confidence.max(PERFECT_MATCH_FLOOR);
    }

    ScoreBreakdown {
        title,
        artist,
        duration,
        confidence,
        tier,
    }
}

/// Best score of any source artist against the candidate's artist credit.
///
/// A cleaned source artist contained in the *normalized* (uncleaned)
/// candidate credit counts as a full match, so "Queen" still hits
/// "Queen & David Bowie".
fn artist_score(source_artists: &[String], candidate_artist: &str) -> f64 {
    let candidate_cleaned = clean_artist(candidate_artist);
    let candidate_normalized = normalize(candidate_artist);

    let mut best = 0.0_f64;
    for artist in source_artists.iter().filter(|a| !a.is_empty()) {
        let cleaned = clean_artist(artist);
        let score = if candidate_normalized.contains(cleaned.as_str()) {
            1.0
        } else {
            similarity(&cleaned, &candidate_cleaned)
        };

        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}
