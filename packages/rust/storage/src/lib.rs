//! libSQL storage layer for merged song records.
//!
//! The [`Storage`] struct wraps a local libSQL database holding the songs
//! table, ingest-job history, and per-artist resumption checkpoints.
//! Song writes are upserts keyed on `song_id`, so re-ingesting the same
//! artist never produces duplicate rows. Nested structures (lyrics, credits,
//! tags) are stored as JSON text blobs.

mod export;
mod migrations;

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use uuid::Uuid;

use lyricat_shared::{ArtistRef, LyricatError, Result, SongRecord};

pub use export::export_csv;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path`, applying pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LyricatError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LyricatError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LyricatError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    LyricatError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Song operations
    // -----------------------------------------------------------------------

    /// Upsert one batch of song records.
    ///
    /// Conflicts on `song_id` replace the existing row, keeping ingestion
    /// idempotent across repeated or resumed runs.
    pub async fn upsert_songs(&self, records: &[SongRecord]) -> Result<()> {
        for record in records {
            self.upsert_song(record).await?;
        }
        Ok(())
    }

    async fn upsert_song(&self, record: &SongRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO songs (
                   song_id, title, title_with_featured, artist, artist_url,
                   primary_artist_id, url, lyrics, lyrics_language, lyrics_created_at,
                   lyrics_updated_at, lyrics_state, release_date, published,
                   recording_location, album_id, album_title, album_artist_id,
                   album_href, produced_by, featuring, featured_artist_ids, tags,
                   ingested_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                         ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)
                 ON CONFLICT(song_id) DO UPDATE SET
                   title = excluded.title,
                   title_with_featured = excluded.title_with_featured,
                   artist = excluded.artist,
                   artist_url = excluded.artist_url,
                   primary_artist_id = excluded.primary_artist_id,
                   url = excluded.url,
                   lyrics = excluded.lyrics,
                   lyrics_language = excluded.lyrics_language,
                   lyrics_created_at = excluded.lyrics_created_at,
                   lyrics_updated_at = excluded.lyrics_updated_at,
                   lyrics_state = excluded.lyrics_state,
                   release_date = excluded.release_date,
                   published = excluded.published,
                   recording_location = excluded.recording_location,
                   album_id = excluded.album_id,
                   album_title = excluded.album_title,
                   album_artist_id = excluded.album_artist_id,
                   album_href = excluded.album_href,
                   produced_by = excluded.produced_by,
                   featuring = excluded.featuring,
                   featured_artist_ids = excluded.featured_artist_ids,
                   tags = excluded.tags,
                   ingested_at = excluded.ingested_at",
                params![
                    record.song_id as i64,
                    record.title.as_str(),
                    record.title_with_featured.as_deref(),
                    record.artist.as_str(),
                    record.artist_url.as_deref(),
                    record.primary_artist_id as i64,
                    record.url.as_str(),
                    json_blob(&record.lyrics)?,
                    record.lyrics_language.as_deref(),
                    record.lyrics_created_at.as_deref(),
                    record.lyrics_updated_at.as_deref(),
                    record.lyrics_state.as_deref(),
                    record.release_date.as_deref(),
                    record.published.map(i64::from),
                    record.recording_location.as_deref(),
                    record.album_id.map(|v| v as i64),
                    record.album_title.as_deref(),
                    record.album_artist_id.map(|v| v as i64),
                    record.album_href.as_deref(),
                    optional_json_blob(&record.produced_by)?,
                    optional_json_blob(&record.featuring)?,
                    optional_json_blob(&record.featured_artist_ids)?,
                    json_blob(&record.tags)?,
                    record.ingested_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| LyricatError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Song ids already stored for an artist — the processed set used to
    /// skip per-song work on resumed runs.
    pub async fn processed_song_ids(&self, artist_id: u64) -> Result<HashSet<u64>> {
        let mut rows = self
            .conn
            .query(
                "SELECT song_id FROM songs WHERE primary_artist_id = ?1",
                params![artist_id as i64],
            )
            .await
            .map_err(|e| LyricatError::Storage(e.to_string()))?;

        let mut ids = HashSet::new();
        while let Ok(Some(row)) = rows.next().await {
            let id: i64 = row
                .get(0)
                .map_err(|e| LyricatError::Storage(e.to_string()))?;
            ids.insert(id as u64);
        }
        Ok(ids)
    }

    /// List all stored songs for an artist, ordered by title.
    pub async fn list_songs(&self, artist_id: u64) -> Result<Vec<SongRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT song_id, title, title_with_featured, artist, artist_url,
                        primary_artist_id, url, lyrics, lyrics_language, lyrics_created_at,
                        lyrics_updated_at, lyrics_state, release_date, published,
                        recording_location, album_id, album_title, album_artist_id,
                        album_href, produced_by, featuring, featured_artist_ids, tags,
                        ingested_at
                 FROM songs WHERE primary_artist_id = ?1 ORDER BY title",
                params![artist_id as i64],
            )
            .await
            .map_err(|e| LyricatError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_song_record(&row)?);
        }
        Ok(results)
    }

    /// Total number of stored songs.
    pub async fn song_count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM songs", params![])
            .await
            .map_err(|e| LyricatError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| LyricatError::Storage(e.to_string()))?;
                Ok(count as u64)
            }
            _ => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // Checkpoint operations
    // -----------------------------------------------------------------------

    /// Last fully flushed catalog page for an artist, if any.
    pub async fn get_checkpoint(&self, artist_id: u64) -> Result<Option<u32>> {
        let mut rows = self
            .conn
            .query(
                "SELECT last_page FROM checkpoints WHERE artist_id = ?1",
                params![artist_id as i64],
            )
            .await
            .map_err(|e| LyricatError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let page: i64 = row
                    .get(0)
                    .map_err(|e| LyricatError::Storage(e.to_string()))?;
                Ok(Some(page as u32))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(LyricatError::Storage(e.to_string())),
        }
    }

    /// Record the last fully flushed catalog page for an artist.
    pub async fn set_checkpoint(&self, artist_id: u64, last_page: u32) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO checkpoints (artist_id, last_page, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(artist_id) DO UPDATE SET
                   last_page = excluded.last_page,
                   updated_at = excluded.updated_at",
                params![artist_id as i64, last_page as i64, now.as_str()],
            )
            .await
            .map_err(|e| LyricatError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ingest job operations
    // -----------------------------------------------------------------------

    /// Insert a new ingest job. Returns the generated job ID.
    pub async fn insert_ingest_job(&self, artist_id: u64) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO ingest_jobs (id, artist_id, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), artist_id as i64, now.as_str()],
            )
            .await
            .map_err(|e| LyricatError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Update an ingest job with completion data.
    pub async fn update_ingest_job(&self, job_id: &str, stats_json: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE ingest_jobs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, job_id],
            )
            .await
            .map_err(|e| LyricatError::Storage(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row / blob conversion
// ---------------------------------------------------------------------------

fn json_blob<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| LyricatError::Storage(e.to_string()))
}

fn optional_json_blob<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value.as_ref().map(|v| json_blob(v)).transpose()
}

fn parse_blob<T: serde::de::DeserializeOwned>(blob: &str, column: &str) -> Result<T> {
    serde_json::from_str(blob)
        .map_err(|e| LyricatError::Storage(format!("corrupt {column} blob: {e}")))
}

/// Convert a database row to a [`SongRecord`].
fn row_to_song_record(row: &libsql::Row) -> Result<SongRecord> {
    let get_text = |idx: i32| -> Result<String> {
        row.get::<String>(idx)
            .map_err(|e| LyricatError::Storage(e.to_string()))
    };
    let get_opt_text = |idx: i32| -> Option<String> { row.get::<String>(idx).ok() };

    let lyrics: Vec<String> = parse_blob(&get_text(7)?, "lyrics")?;
    let produced_by: Option<Vec<ArtistRef>> = get_opt_text(19)
        .map(|blob| parse_blob(&blob, "produced_by"))
        .transpose()?;
    let featuring: Option<Vec<ArtistRef>> = get_opt_text(20)
        .map(|blob| parse_blob(&blob, "featuring"))
        .transpose()?;
    let featured_artist_ids: Option<Vec<u64>> = get_opt_text(21)
        .map(|blob| parse_blob(&blob, "featured_artist_ids"))
        .transpose()?;
    let tags: Vec<String> = parse_blob(&get_text(22)?, "tags")?;

    Ok(SongRecord {
        song_id: row
            .get::<i64>(0)
            .map_err(|e| LyricatError::Storage(e.to_string()))? as u64,
        title: get_text(1)?,
        title_with_featured: get_opt_text(2),
        artist: get_text(3)?,
        artist_url: get_opt_text(4),
        primary_artist_id: row
            .get::<i64>(5)
            .map_err(|e| LyricatError::Storage(e.to_string()))? as u64,
        url: get_text(6)?,
        lyrics,
        lyrics_language: get_opt_text(8),
        lyrics_created_at: get_opt_text(9),
        lyrics_updated_at: get_opt_text(10),
        lyrics_state: get_opt_text(11),
        release_date: get_opt_text(12),
        published: row.get::<i64>(13).ok().map(|v| v != 0),
        recording_location: get_opt_text(14),
        album_id: row.get::<i64>(15).ok().map(|v| v as u64),
        album_title: get_opt_text(16),
        album_artist_id: row.get::<i64>(17).ok().map(|v| v as u64),
        album_href: get_opt_text(18),
        produced_by,
        featuring,
        featured_artist_ids,
        tags,
        ingested_at: {
            let s = get_text(23)?;
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|e| LyricatError::Storage(format!("invalid date: {e}")))?
        },
    })
}
