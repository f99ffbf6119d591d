//! Persisted mirror of the library, used as a match cache.
//!
//! Uses SQLx with SQLite. The `library_tracks` table holds one row per
//! library track and is refreshed wholesale from the media server. Lookups
//! go through [`SqliteMatchCache`], which scores rows with its own
//! confidence formula before the matcher sees them.
//!
//! # Example
//!
//! ```ignore
//! use soulsync::db::{init_db, SqliteMatchCache};
//!
//! let pool = init_db("sqlite:soulsync.db").await?;
//! let cache = SqliteMatchCache::new(pool);
//! let (hit, confidence) = cache.lookup("Creep", "Radiohead", 0.7).await?;
//! ```

mod cache;

pub use cache::{SqliteMatchCache, cache_confidence, title_variations};

use futures::TryStreamExt;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::error::{Result, ResultExt};
use crate::model::{CandidateSource, CandidateTrack};

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist.
pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url)
            .await
            .with_context(format!("Failed to create database {}", db_url))?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!(target: "db", url = db_url, "Database ready");
    Ok(pool)
}

#[derive(Debug, Clone, FromRow)]
struct TrackRow {
    id: String,
    title: String,
    artist: String,
    album: String,
    duration_ms: Option<i64>,
}

impl From<TrackRow> for CandidateTrack {
    fn from(row: TrackRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            artist: row.artist,
            album: row.album,
            duration_ms: row.duration_ms.and_then(|d| u64::try_from(d).ok()).filter(|&d| d > 0),
            source: CandidateSource::Cache,
        }
    }
}

/// Insert or replace library tracks in one transaction.
///
/// Returns the number of rows written.
pub async fn upsert_tracks(pool: &SqlitePool, tracks: &[CandidateTrack]) -> Result<u64> {
    let now = timestamp();
    let mut tx = pool.begin().await?;
    let mut written = 0;

    for track in tracks {
        let duration = track.duration_ms.and_then(|d| i64::try_from(d).ok());
        let result = sqlx::query(
            "INSERT INTO library_tracks (id, title, artist, album, duration_ms, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                album = excluded.album,
                duration_ms = excluded.duration_ms,
                updated_at = excluded.updated_at",
        )
        .bind(&track.id)
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(duration)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    tracing::info!(target: "db", tracks = written, "Library tracks stored");
    Ok(written)
}

/// Remove rows not refreshed since `cutoff` (RFC 3339, UTC).
pub async fn delete_stale(pool: &SqlitePool, cutoff: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM library_tracks WHERE updated_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Number of cached library tracks.
pub async fn count_tracks(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM library_tracks")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Search cached tracks by title and/or artist substring.
///
/// SQL `LIKE` runs first. When it finds nothing the table is scanned and
/// both sides are compared transliterated to ASCII, so "Beyonce" finds
/// "Beyoncé". Empty title and artist return nothing.
pub async fn search_tracks(pool: &SqlitePool, title: &str, artist: &str, limit: usize) -> Result<Vec<CandidateTrack>> {
    if title.is_empty() && artist.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<TrackRow> = sqlx::query_as(
        "SELECT id, title, artist, album, duration_ms FROM library_tracks
         WHERE (? = '' OR title LIKE '%' || ? || '%')
           AND (? = '' OR artist LIKE '%' || ? || '%')
         ORDER BY title, artist
         LIMIT ?",
    )
    .bind(title)
    .bind(title)
    .bind(artist)
    .bind(artist)
    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await?;

    if !rows.is_empty() {
        tracing::debug!(target: "db", title, artist, found = rows.len(), "LIKE search");
        return Ok(rows.into_iter().map(CandidateTrack::from).collect());
    }

    let title_key = fold(title);
    let artist_key = fold(artist);
    let mut found = Vec::new();
    let mut stream = sqlx::query_as::<_, TrackRow>(
        "SELECT id, title, artist, album, duration_ms FROM library_tracks ORDER BY title, artist",
    )
    .fetch(pool);

    while let Some(row) = stream.try_next().await? {
        if fold(&row.title).contains(&title_key) && fold(&row.artist).contains(&artist_key) {
            found.push(CandidateTrack::from(row));
            if found.len() >= limit {
                break;
            }
        }
    }

    tracing::debug!(target: "db", title, artist, found = found.len(), "Transliterated search");
    Ok(found)
}

/// Fixed-width UTC timestamp, so stored values compare as strings.
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

/// ASCII transliteration, lowercased
fn fold(text: &str) -> String {
    any_ascii::any_ascii(text).to_lowercase()
}
