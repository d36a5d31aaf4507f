//! SQL migration definitions for the lyricat database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as a batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: songs, ingest_jobs, checkpoints",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per ingested song. song_id is the service-side identifier;
-- keying on it makes repeated ingests upsert instead of duplicating rows.
CREATE TABLE IF NOT EXISTS songs (
    song_id             INTEGER PRIMARY KEY,
    title               TEXT NOT NULL,
    title_with_featured TEXT,
    artist              TEXT NOT NULL,
    artist_url          TEXT,
    primary_artist_id   INTEGER NOT NULL,
    url                 TEXT NOT NULL,
    lyrics              TEXT NOT NULL,
    lyrics_language     TEXT,
    lyrics_created_at   TEXT,
    lyrics_updated_at   TEXT,
    lyrics_state        TEXT,
    release_date        TEXT,
    published           INTEGER,
    recording_location  TEXT,
    album_id            INTEGER,
    album_title         TEXT,
    album_artist_id     INTEGER,
    album_href          TEXT,
    produced_by         TEXT,
    featuring           TEXT,
    featured_artist_ids TEXT,
    tags                TEXT NOT NULL,
    ingested_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_songs_primary_artist ON songs(primary_artist_id);

-- Ingest run history
CREATE TABLE IF NOT EXISTS ingest_jobs (
    id          TEXT PRIMARY KEY,
    artist_id   INTEGER NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

CREATE INDEX IF NOT EXISTS idx_ingest_jobs_artist ON ingest_jobs(artist_id);

-- Resumption checkpoints: last fully flushed catalog page per artist
CREATE TABLE IF NOT EXISTS checkpoints (
    artist_id  INTEGER PRIMARY KEY,
    last_page  INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
