//! String normalization for cross-catalog comparison.
//!
//! Everything here is pure and total: empty input yields an empty string,
//! never an error.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// Patterns
// ============================================================================

/// Anything that is not a lowercase letter, digit, whitespace or hyphen.
static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Title noise, applied in order. Bracketed spans go first so a
/// "(feat. X)" is gone before the feat patterns run on the bare title.
static TITLE_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\(.*\)",
        r"(?i)\[.*\]",
        r"(?i)-\s*single version",
        r"(?i)-\s*remaster.*",
        r"(?i)-\s*live.*",
        r"(?i)-\s*remix",
        r"(?i)-\s*radio edit",
        r"(?i)\s+feat\.?.*",
        r"(?i)\s+ft\.?.*",
        r"(?i)\s+featuring.*",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Collaborator separators; each one drops everything to end of string.
static ARTIST_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\s*feat\..*",
        r"(?i)\s*ft\..*",
        r"(?i)\s*featuring.*",
        r"(?i)\s*&.*",
        r"(?i)\s*and.*",
        r"(?i),.*",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// ============================================================================
// Public API
// ============================================================================

/// Transliterate to ASCII, lowercase, keep only letters/digits/whitespace/
/// hyphens, collapse whitespace runs and trim.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let ascii = any_ascii(text).to_lowercase();
    let stripped = DISALLOWED_CHARS.replace_all(&ascii, "");
    WHITESPACE_RUN.replace_all(&stripped, " ").trim().to_string()
}

/// Strip version/featuring noise from a title, then [`normalize`] it.
pub fn clean_title(title: &str) -> String {
    normalize(&strip_patterns(title, &TITLE_NOISE))
}

/// Reduce an artist credit to its primary artist, then [`normalize`] it.
pub fn clean_artist(artist: &str) -> String {
    normalize(&strip_patterns(artist, &ARTIST_NOISE))
}

fn strip_patterns(text: &str, patterns: &[Regex]) -> String {
    let mut cleaned = text.to_string();
    for pattern in patterns {
        cleaned = pattern.replace_all(&cleaned, "").trim().to_string();
    }
    cleaned
}
