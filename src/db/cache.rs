//! Match cache lookups over the `library_tracks` table.
//!
//! A lookup searches the table once per title variation and keeps the row
//! with the highest cache confidence:
//!
//! ```text
//! confidence = max(title_sim, flattened_title_sim) * 0.5 + artist_sim * 0.5
//! confidence *= 0.3   if artist_sim < 0.6
//! ```
//!
//! Similarities are edit-distance ratios over transliterated lowercase text.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::sqlite::SqlitePool;

use super::{count_tracks, delete_stale, search_tracks, timestamp, upsert_tracks};
use crate::error::Result;
use crate::matching::edit_similarity;
use crate::model::CandidateTrack;

/// Rows fetched per title variation.
const CANDIDATES_PER_VARIATION: usize = 20;

/// Artist similarity below this scales the confidence down.
const ARTIST_FLOOR: f64 = 0.6;
const ARTIST_PENALTY: f64 = 0.3;

static PAREN_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(([^)]+)\)\s*").unwrap());

/// Markers that never distinguish recordings. Remixes and versions are
/// deliberately absent.
static MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\s*\(explicit\)",
        r"(?i)\s*\(clean\)",
        r"(?i)\s*\[explicit\]",
        r"(?i)\s*\[clean\]",
        r"(?i)\s*\(.*feat\..*\)",
        r"(?i)\s*\(.*featuring.*\)",
        r"(?i)\s*\(.*ft\..*\)",
        r"(?i)\s*\(radio\s*edit\)",
        r"(?i)\s*\(tv\s*edit\)",
        r"(?i)\s*\[radio\s*edit\]",
        r"(?i)\s*\[tv\s*edit\]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static OPEN_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[\[(]\s*").unwrap());
static CLOSE_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[\])]\s*").unwrap());
static DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-\s*").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static FLAT_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\s*explicit\s*",
        r"(?i)\s*clean\s*",
        r"(?i)\s*feat\..*",
        r"(?i)\s*featuring.*",
        r"(?i)\s*ft\..*",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// SQLite-backed [`MatchCache`](crate::backends::traits::MatchCache).
#[derive(Debug, Clone)]
pub struct SqliteMatchCache {
    pool: SqlitePool,
}

impl SqliteMatchCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Replace the cache contents with `tracks`.
    ///
    /// Rows for tracks no longer in the library are removed.
    pub async fn refresh(&self, tracks: &[CandidateTrack]) -> Result<u64> {
        let cutoff = timestamp();
        let written = upsert_tracks(&self.pool, tracks).await?;
        let removed = delete_stale(&self.pool, &cutoff).await?;

        tracing::info!(
            target: "db",
            written,
            removed,
            total = count_tracks(&self.pool).await?,
            "Match cache refreshed"
        );
        Ok(written)
    }

    /// Best cached track for `title` by `artist`.
    ///
    /// Returns the track only when its confidence reaches `threshold`; the
    /// best confidence seen is returned either way.
    pub async fn lookup(&self, title: &str, artist: &str, threshold: f64) -> Result<(Option<CandidateTrack>, f64)> {
        let mut best: Option<CandidateTrack> = None;
        let mut best_confidence = 0.0;

        for variation in title_variations(title) {
            let rows = search_tracks(&self.pool, &variation, artist, CANDIDATES_PER_VARIATION).await?;
            for row in rows {
                let confidence = cache_confidence(title, artist, &row);
                if confidence > best_confidence {
                    best_confidence = confidence;
                    best = Some(row);
                }
            }
        }

        match best {
            Some(track) if best_confidence >= threshold => {
                tracing::debug!(
                    target: "db",
                    title,
                    artist,
                    matched = %track.title,
                    confidence = best_confidence,
                    "Cache hit"
                );
                Ok((Some(track), best_confidence))
            }
            _ => {
                tracing::debug!(target: "db", title, artist, best = best_confidence, threshold, "Cache miss");
                Ok((None, best_confidence))
            }
        }
    }
}

/// Search forms of a title, original first, deduplicated case-insensitively.
///
/// Adds the dash/parenthesis counterpart ("Song - Live" and "Song (Live)")
/// and forms with explicit/clean, featuring and radio/TV edit markers
/// removed.
pub fn title_variations(title: &str) -> Vec<String> {
    let mut variations = vec![title.to_string()];

    if let Some((head, tail)) = title.split_once(" - ") {
        variations.push(format!("{} ({})", head, tail));
    }

    if title.contains('(') && title.contains(')') {
        let dashed = PAREN_GROUP.replace_all(title, " - $1");
        if dashed != title {
            variations.push(dashed.into_owned());
        }
    }

    let title_lower = title.trim().to_lowercase();
    for marker in MARKERS.iter() {
        let cleaned = marker.replace_all(title, "").trim().to_string();
        if !cleaned.is_empty() && cleaned.to_lowercase() != title_lower {
            variations.push(cleaned);
        }
    }

    let mut seen = std::collections::HashSet::new();
    variations
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && seen.insert(v.to_lowercase()))
        .collect()
}

/// Cache confidence of `candidate` for the searched title and artist.
pub fn cache_confidence(title: &str, artist: &str, candidate: &CandidateTrack) -> f64 {
    let title_sim = edit_similarity(&fold(title), &fold(&candidate.title));
    let flat_sim = edit_similarity(&flatten_title(title), &flatten_title(&candidate.title));
    let artist_sim = edit_similarity(&fold(artist), &fold(&candidate.artist));

    let confidence = title_sim.max(flat_sim) * 0.5 + artist_sim * 0.5;
    if artist_sim < ARTIST_FLOOR {
        confidence * ARTIST_PENALTY
    } else {
        confidence
    }
}

fn fold(text: &str) -> String {
    any_ascii::any_ascii(text).to_lowercase().trim().to_string()
}

/// Brackets and dashes to spaces, markers removed.
fn flatten_title(title: &str) -> String {
    let mut flat = fold(title);
    flat = OPEN_BRACKET.replace_all(&flat, " ").into_owned();
    flat = CLOSE_BRACKET.replace_all(&flat, " ").into_owned();
    flat = DASH.replace_all(&flat, " ").into_owned();
    for noise in FLAT_NOISE.iter() {
        flat = noise.replace_all(&flat, "").trim().to_string();
    }
    WHITESPACE_RUN.replace_all(&flat, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidateSource;
    use crate::test_utils::temp_db;

    fn row(title: &str, artist: &str) -> CandidateTrack {
        CandidateTrack {
            id: format!("{}-{}", artist, title),
            title: title.to_string(),
            artist: artist.to_string(),
            album: String::new(),
            duration_ms: None,
            source: CandidateSource::Library,
        }
    }

    #[test]
    fn test_dash_and_paren_variations() {
        assert_eq!(title_variations("Song - Live"), vec!["Song - Live", "Song (Live)"]);
        assert_eq!(
            title_variations("Song (feat. Someone)"),
            vec!["Song (feat. Someone)", "Song - feat. Someone", "Song"]
        );
    }

    #[test]
    fn test_marker_variations() {
        assert_eq!(title_variations("Hello (Radio Edit)"), vec!["Hello (Radio Edit)", "Hello - Radio Edit", "Hello"]);
        assert_eq!(title_variations("Plain"), vec!["Plain"]);
    }

    #[test]
    fn test_remix_is_not_stripped() {
        let variations = title_variations("Song (Remix)");
        assert!(!variations.iter().any(|v| v == "Song"));
    }

    #[test]
    fn test_flatten_title() {
        assert_eq!(flatten_title("Creep (Explicit)"), "creep");
        assert_eq!(flatten_title("Song [Live] - 2011"), "song live 2011");
        assert_eq!(flatten_title("Track (feat. X)"), "track");
    }

    #[test]
    fn test_confidence_exact_and_accented() {
        assert_eq!(cache_confidence("Creep", "Radiohead", &row("Creep", "Radiohead")), 1.0);
        assert_eq!(cache_confidence("Deja Vu", "Beyonce", &row("Déjà Vu", "Beyoncé")), 1.0);
    }

    #[test]
    fn test_confidence_artist_penalty() {
        let confidence = cache_confidence("Creep", "Radiohead", &row("Creep", "TLC"));
        assert!(confidence < 0.3, "got {}", confidence);
    }

    #[tokio::test]
    async fn test_lookup_hit_through_variation() {
        let (pool, _dir) = temp_db().await;
        let cache = SqliteMatchCache::new(pool);
        cache.refresh(&[row("Creep", "Radiohead")]).await.unwrap();

        let (hit, confidence) = cache.lookup("Creep (Explicit)", "Radiohead", 0.7).await.unwrap();
        let hit = hit.unwrap();
        assert_eq!(hit.title, "Creep");
        assert_eq!(hit.source, CandidateSource::Cache);
        assert_eq!(confidence, 1.0);
    }

    #[tokio::test]
    async fn test_lookup_below_threshold_reports_best() {
        let (pool, _dir) = temp_db().await;
        let cache = SqliteMatchCache::new(pool);
        cache.refresh(&[row("Creep", "Radiohead Tribute Band")]).await.unwrap();

        let (hit, confidence) = cache.lookup("Creep", "Radiohead", 0.7).await.unwrap();
        assert!(hit.is_none());
        assert!(confidence > 0.0 && confidence < 0.7);
    }

    #[tokio::test]
    async fn test_lookup_empty_cache() {
        let (pool, _dir) = temp_db().await;
        let cache = SqliteMatchCache::new(pool);

        let (hit, confidence) = cache.lookup("Anything", "Anyone", 0.7).await.unwrap();
        assert!(hit.is_none());
        assert_eq!(confidence, 0.0);
    }

    #[tokio::test]
    async fn test_refresh_removes_departed_tracks() {
        let (pool, _dir) = temp_db().await;
        let cache = SqliteMatchCache::new(pool);

        cache.refresh(&[row("Creep", "Radiohead"), row("Gone", "Someone")]).await.unwrap();
        cache.refresh(&[row("Creep", "Radiohead")]).await.unwrap();

        assert_eq!(count_tracks(cache.pool()).await.unwrap(), 1);
    }
}
