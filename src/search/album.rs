//! Folder-level grouping of track results into albums.
//!
//! Files shared by the same peer from the same directory form an album once
//! there are at least two of them. Every parsed track ends up in exactly one
//! place: an album's track list or the individual-track list.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::parser::TrackResult;
use super::quality::{AudioQuality, PeerStats, album_score};

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s*[-\.\s]+").expect("valid regex"));
static TRAILING_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[-\(\[]?\d{4}[-\)\]]?\s*$").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static ARTIST_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*[-–]\s*(.+)$").expect("valid regex"));

/// Year patterns, most specific first.
static YEAR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\((\d{4})\)",
        r"\[(\d{4})\]",
        r"\s-(\d{4})$",
        r"\s(\d{4})\s",
        r"\s(\d{4})$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

const MIN_ALBUM_TRACKS: usize = 2;
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Two or more files from one peer's directory.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumResult {
    pub username: String,
    /// Directory path with '/' separators
    pub album_path: String,
    pub album_title: String,
    pub artist: Option<String>,
    pub year: Option<u16>,
    pub track_count: usize,
    /// Sum of member sizes in bytes
    pub total_size: u64,
    /// Members ordered by track number; unnumbered tracks first
    pub tracks: Vec<TrackResult>,
    pub dominant_quality: AudioQuality,
    pub peer: PeerStats,
}

impl AlbumResult {
    /// Ranking score; may exceed 1.0.
    pub fn quality_score(&self) -> f64 {
        album_score(self.dominant_quality, self.track_count, &self.peer)
    }

    /// Whole mebibytes.
    pub fn size_mb(&self) -> u64 {
        self.total_size / BYTES_PER_MB
    }

    pub fn average_track_size_mb(&self) -> f64 {
        if self.track_count == 0 {
            return 0.0;
        }
        self.size_mb() as f64 / self.track_count as f64
    }
}

/// Split parsed tracks into individual tracks and albums.
///
/// Albums come out in the order their first member was seen; individual
/// tracks keep their input order.
pub fn aggregate(tracks: Vec<TrackResult>) -> (Vec<TrackResult>, Vec<AlbumResult>) {
    let mut groups: Vec<((String, String), Vec<usize>)> = Vec::new();
    let mut group_index: HashMap<(String, String), usize> = HashMap::new();

    for (i, track) in tracks.iter().enumerate() {
        let Some(path) = album_path(&track.filename) else {
            continue;
        };
        let key = (track.username.clone(), path);
        match group_index.get(&key) {
            Some(&g) => groups[g].1.push(i),
            None => {
                group_index.insert(key.clone(), groups.len());
                groups.push((key, vec![i]));
            }
        }
    }

    let mut slots: Vec<Option<TrackResult>> = tracks.into_iter().map(Some).collect();
    let mut albums = Vec::new();

    for ((username, path), members) in groups {
        if members.len() < MIN_ALBUM_TRACKS {
            continue;
        }
        let members: Vec<TrackResult> = members.into_iter().filter_map(|i| slots[i].take()).collect();
        albums.push(build_album(username, path, members));
    }

    let individual: Vec<TrackResult> = slots.into_iter().flatten().collect();

    tracing::debug!(
        target: "search",
        individual = individual.len(),
        albums = albums.len(),
        "Aggregated search results"
    );

    (individual, albums)
}

/// Directory containing `filename`, if it is specific enough to group by.
///
/// Returns `None` for bare filenames and for parent folders that are
/// hidden/system ('@...') or a single character.
pub fn album_path(filename: &str) -> Option<String> {
    if !filename.contains(['/', '\\']) {
        return None;
    }
    let normalized = filename.replace('\\', "/");
    let (parent, _) = normalized.rsplit_once('/')?;
    let dir = parent.rsplit('/').next().unwrap_or(parent);

    if dir.starts_with('@') || dir.chars().count() < 2 {
        return None;
    }
    Some(parent.to_string())
}

fn build_album(username: String, album_path: String, mut tracks: Vec<TrackResult>) -> AlbumResult {
    let album_title = album_title(&album_path);
    let artist = album_artist(&tracks, &album_path);
    let year = extract_year(&album_path, &album_title);
    let dominant_quality = most_common(tracks.iter().map(|t| t.quality)).unwrap_or(AudioQuality::Unknown);
    let peer = tracks.first().map(|t| t.peer).unwrap_or_default();
    let total_size = tracks.iter().map(|t| t.size).sum();

    tracks.sort_by_key(|t| t.track_number.unwrap_or(0));

    AlbumResult {
        username,
        album_path,
        album_title,
        artist,
        year,
        track_count: tracks.len(),
        total_size,
        tracks,
        dominant_quality,
        peer,
    }
}

/// Last path segment without a leading "NN - " or trailing year.
fn album_title(album_path: &str) -> String {
    let dir = last_segment(album_path);
    let cleaned = LEADING_NUMBER.replace(dir, "");
    let cleaned = TRAILING_YEAR.replace(&cleaned, "");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        dir.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Most common track artist, else the "Artist - Album" folder prefix.
fn album_artist(tracks: &[TrackResult], album_path: &str) -> Option<String> {
    let from_tracks = most_common(
        tracks
            .iter()
            .filter_map(|t| t.artist.as_deref())
            .filter(|a| !a.is_empty()),
    );
    if let Some(artist) = from_tracks {
        return Some(artist.to_string());
    }

    let caps = ARTIST_PREFIX.captures(last_segment(album_path))?;
    let artist = caps[1].trim();
    (artist.chars().count() > 1).then(|| artist.to_string())
}

fn extract_year(album_path: &str, album_title: &str) -> Option<u16> {
    let text = format!("{} {}", album_path, album_title);

    YEAR_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.captures(&text)?;
        let year: u16 = caps[1].parse().ok()?;
        (1900..=2030).contains(&year).then_some(year)
    })
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Most frequent item; ties go to the one seen first.
fn most_common<T: PartialEq + Copy>(items: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (item, n) in counts {
        if best.is_none_or(|(_, best_n)| n > best_n) {
            best = Some((item, n));
        }
    }
    best.map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::parser::parse_response;
    use crate::test_utils::{album_response, raw_file, raw_response};

    #[test]
    fn test_queen_album() {
        let response = raw_response(
            "freddie",
            vec![
                raw_file(
                    "Music\\Queen\\A Night at the Opera (1975)\\02 - Queen - Lazing on a Sunday Afternoon.flac",
                    20_000_000,
                ),
                raw_file(
                    "Music\\Queen\\A Night at the Opera (1975)\\01 - Queen - Bohemian Rhapsody.flac",
                    40_000_000,
                ),
            ],
        );

        let (individual, albums) = aggregate(parse_response(&response));
        assert!(individual.is_empty());
        assert_eq!(albums.len(), 1);

        let album = &albums[0];
        assert_eq!(album.album_title, "A Night at the Opera");
        assert_eq!(album.album_path, "Music/Queen/A Night at the Opera (1975)");
        assert_eq!(album.artist.as_deref(), Some("Queen"));
        assert_eq!(album.year, Some(1975));
        assert_eq!(album.track_count, 2);
        assert_eq!(album.total_size, 60_000_000);
        assert_eq!(album.dominant_quality, AudioQuality::Flac);
        assert_eq!(album.tracks[0].title, "Bohemian Rhapsody");
        assert_eq!(album.tracks[0].track_number, Some(1));
    }

    #[test]
    fn test_single_file_stays_individual() {
        let response = raw_response(
            "peer",
            vec![
                raw_file("Music/Album One/01 - Song.mp3", 1),
                raw_file("Music/Album Two/01 - Song.mp3", 1),
            ],
        );

        let (individual, albums) = aggregate(parse_response(&response));
        assert!(albums.is_empty());
        assert_eq!(individual.len(), 2);
    }

    #[test]
    fn test_same_folder_different_peers() {
        let mut files = vec![raw_file("Shared/Album/01 - A.mp3", 1)];
        let mut tracks = parse_response(&raw_response("alice", files.clone()));
        files[0].filename = "Shared/Album/02 - B.mp3".into();
        tracks.extend(parse_response(&raw_response("bob", files)));

        let (individual, albums) = aggregate(tracks);
        assert!(albums.is_empty());
        assert_eq!(individual.len(), 2);
    }

    #[test]
    fn test_bare_filenames_never_group() {
        let response = raw_response(
            "peer",
            vec![raw_file("Artist - One.mp3", 1), raw_file("Artist - Two.mp3", 1)],
        );
        let (individual, albums) = aggregate(parse_response(&response));
        assert!(albums.is_empty());
        assert_eq!(individual.len(), 2);
    }

    #[test]
    fn test_album_path_rules() {
        assert_eq!(album_path("song.mp3"), None);
        assert_eq!(album_path("@Recycle/song.mp3"), None);
        assert_eq!(album_path("Music/X/song.mp3"), None);
        assert_eq!(album_path("Music\\OK Computer\\song.mp3").as_deref(), Some("Music/OK Computer"));
    }

    #[test]
    fn test_album_title_cleanup() {
        assert_eq!(album_title("Music/01 - Debut"), "Debut");
        assert_eq!(album_title("Music/Homework [1997]"), "Homework");
        assert_eq!(album_title("Music/Discovery -2001"), "Discovery");
        assert_eq!(album_title("Music/Random   Access  Memories"), "Random Access Memories");
        assert_eq!(album_title("Music/1999"), "1999");
    }

    #[test]
    fn test_artist_from_folder_name() {
        let response = raw_response(
            "peer",
            vec![raw_file("Daft Punk - Discovery/One.flac", 1), raw_file("Daft Punk - Discovery/Two.flac", 1)],
        );
        let (_, albums) = aggregate(parse_response(&response));
        assert_eq!(albums[0].artist.as_deref(), Some("Daft Punk"));
        assert_eq!(albums[0].album_title, "Daft Punk - Discovery");
    }

    #[test]
    fn test_year_range() {
        assert_eq!(extract_year("Music/Album (1850)", "Album"), None);
        assert_eq!(extract_year("Music/Album [2031]", "Album"), None);
        assert_eq!(extract_year("Music/Album 1994 Remaster", "Album"), Some(1994));
        assert_eq!(extract_year("Music/Album", "Album"), None);
    }

    #[test]
    fn test_dominant_quality_tie_keeps_first() {
        let response = raw_response(
            "peer",
            vec![raw_file("Music/Mixed/01 - A.mp3", 1), raw_file("Music/Mixed/02 - B.flac", 1)],
        );
        let (_, albums) = aggregate(parse_response(&response));
        assert_eq!(albums[0].dominant_quality, AudioQuality::Mp3);
    }

    #[test]
    fn test_unnumbered_tracks_sort_first() {
        let response = raw_response(
            "peer",
            vec![
                raw_file("Music/Album/03 - Three.mp3", 1),
                raw_file("Music/Album/Bonus.mp3", 1),
                raw_file("Music/Album/01 - One.mp3", 1),
            ],
        );
        let (_, albums) = aggregate(parse_response(&response));
        let titles: Vec<&str> = albums[0].tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Bonus", "One", "Three"]);
    }

    #[test]
    fn test_size_helpers() {
        let (_, albums) = aggregate(parse_response(&album_response("peer", "Music\\Big Album", "Band", 10)));
        let album = &albums[0];
        assert_eq!(album.track_count, 10);
        assert_eq!(album.size_mb(), 300_000_000 / (1024 * 1024));
        assert!((album.average_track_size_mb() - album.size_mb() as f64 / 10.0).abs() < 1e-9);
        // flac + 8..=20 tracks
        assert!((album.quality_score() - 1.1).abs() < 1e-9);
    }
}
