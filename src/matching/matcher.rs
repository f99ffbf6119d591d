//! Best-candidate selection.

use super::confidence::{MatchTier, confidence};
use super::{Candidate, MATCH_THRESHOLD};
use crate::model::SourceTrack;

/// Outcome of matching one catalog track against a candidate list.
///
/// Built once by [`find_best_match`] and never adjusted afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<C> {
    source: SourceTrack,
    candidate: Option<C>,
    confidence: f64,
    tier: MatchTier,
}

impl<C> MatchResult<C> {
    fn new(source: SourceTrack, candidate: Option<C>, confidence: f64, tier: MatchTier) -> Self {
        Self {
            source,
            candidate,
            confidence,
            tier,
        }
    }

    pub fn source(&self) -> &SourceTrack {
        &self.source
    }

    pub fn candidate(&self) -> Option<&C> {
        self.candidate.as_ref()
    }

    pub fn into_candidate(self) -> Option<C> {
        self.candidate
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn tier(&self) -> MatchTier {
        self.tier
    }

    /// A candidate is present and confidence reaches [`MATCH_THRESHOLD`].
    pub fn is_match(&self) -> bool {
        self.candidate.is_some() && self.confidence >= MATCH_THRESHOLD
    }
}

/// Pick the highest-confidence candidate for `source`.
///
/// Linear scan; only a strictly greater confidence replaces the current
/// best, so ties keep the first candidate seen. An empty list yields
/// [`MatchTier::NoCandidates`].
pub fn find_best_match<C: Candidate + Clone>(source: &SourceTrack, candidates: &[C]) -> MatchResult<C> {
    if candidates.is_empty() {
        return MatchResult::new(source.clone(), None, 0.0, MatchTier::NoCandidates);
    }

    let mut best: Option<&C> = None;
    let mut best_confidence = 0.0;
    let mut best_tier = MatchTier::NoMatch;

    for candidate in candidates {
        let (score, tier) = confidence(source, candidate);
        if score > best_confidence {
            best = Some(candidate);
            best_confidence = score;
            best_tier = tier;
        }
    }

    tracing::debug!(
        target: "matching",
        track = %source.display_name(),
        candidates = candidates.len(),
        confidence = best_confidence,
        tier = %best_tier,
        "Best match selected"
    );

    MatchResult::new(source.clone(), best.cloned(), best_confidence, best_tier)
}
