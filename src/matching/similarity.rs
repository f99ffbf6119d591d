//! Bounded similarity measures for strings and durations.

/// Durations closer than this are considered identical.
pub const DURATION_TOLERANCE_MS: u64 = 5_000;

/// Penalty multiplier applied to the relative duration difference; a 20%
/// difference already scores zero.
const DURATION_PENALTY: f64 = 5.0;

/// Score returned when either duration is unknown.
pub const NEUTRAL_DURATION_SCORE: f64 = 0.5;

/// Character-sequence similarity in `[0, 1]`.
///
/// Gestalt pattern matching: `2 * M / T`, where `M` is the number of
/// characters in the recursively found longest common blocks and `T` the
/// combined length of both strings. Returns 0.0 if either side is empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let matched = matched_chars(&a, &b);

    (2 * matched) as f64 / (a.len() + b.len()) as f64
}

/// Similarity of two durations in milliseconds.
///
/// - either side 0 (unknown): 0.5
/// - within 5 seconds: 1.0
/// - otherwise `1 - 5 * |Δ| / max`, floored at 0
pub fn duration_similarity(a_ms: u64, b_ms: u64) -> f64 {
    if a_ms == 0 || b_ms == 0 {
        return NEUTRAL_DURATION_SCORE;
    }

    let diff = a_ms.abs_diff(b_ms);
    if diff <= DURATION_TOLERANCE_MS {
        return 1.0;
    }

    let ratio = diff as f64 / a_ms.max(b_ms) as f64;
    (1.0 - ratio * DURATION_PENALTY).max(0.0)
}

/// Edit-distance similarity in `[0, 1]`: `(max_len - levenshtein) / max_len`.
///
/// Used by the match cache, which compares whole titles rather than
/// character blocks. Identical strings score 1.0, an empty side 0.0.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Total size of the matching blocks between `a` and `b`.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        total += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    total
}

/// Longest common block in `a[alo..ahi]` / `b[blo..bhi]`.
///
/// Ties resolve to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // run[j + 1] = length of the common run ending at (i - 1, j)
    let mut run = vec![0usize; b.len() + 1];

    for i in alo..ahi {
        let mut next = vec![0usize; b.len() + 1];
        for j in blo..bhi {
            if a[i] != b[j] {
                continue;
            }
            let k = run[j] + 1;
            next[j + 1] = k;
            if k > best_size {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_size = k;
            }
        }
        run = next;
    }

    (best_i, best_j, best_size)
}
