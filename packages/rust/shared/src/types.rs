//! Core domain types for the lyricat ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SongStub
// ---------------------------------------------------------------------------

/// Minimal per-song identity record from one catalog listing page.
///
/// Ephemeral: produced by the catalog enumerator and consumed once per song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongStub {
    /// Service-side song identifier.
    pub song_id: u64,
    /// Canonical lyrics page URL.
    pub url: String,
    /// Listing title.
    pub title: String,
    /// Identifier of the song's primary artist.
    pub primary_artist_id: u64,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Lyric text and header metadata scraped from one rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedSong {
    /// URL the page was fetched from.
    pub url: String,
    /// Song title from the page header.
    pub title: String,
    /// Primary artist display name from the page header.
    pub artist: String,
    /// Artist page URL, when the header links one.
    pub artist_url: Option<String>,
    /// Lyric lines in page order. Empty lines between consecutive breaks
    /// are retained as empty strings.
    pub lines: Vec<String>,
}

/// Outcome of extracting a lyrics page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Lyrics were present and reconstructed.
    Song(ScrapedSong),
    /// The page has no qualifying lyrics; the song is skipped.
    NoLyrics,
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Album block from the detail payload. All fields are null as a group when
/// the payload carries no album.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub album_id: Option<u64>,
    pub title: Option<String>,
    pub artist_id: Option<u64>,
    pub href: Option<String>,
}

/// A credited artist (producer or featured collaborator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: u64,
    pub name: String,
    pub href: Option<String>,
}

/// Secondary metadata extracted from the per-song detail API.
///
/// `None` on the list fields means the source list was absent from the
/// payload, which is distinct from an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub release_date: Option<String>,
    pub published: Option<bool>,
    pub recording_location: Option<String>,
    pub title_with_featured: Option<String>,
    pub album: Option<AlbumRef>,
    pub producers: Option<Vec<ArtistRef>>,
    pub featuring: Option<Vec<ArtistRef>>,
    pub featured_artist_ids: Option<Vec<u64>>,
    pub language: Option<String>,
    pub lyrics_created_at: Option<String>,
    pub lyrics_updated_at: Option<String>,
    pub lyrics_state: Option<String>,
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// SongRecord
// ---------------------------------------------------------------------------

/// The flat merge of stub + extraction + enrichment, keyed by `song_id`.
///
/// Created once per song and never mutated; one row in the songs table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    pub song_id: u64,
    pub title: String,
    pub title_with_featured: Option<String>,
    pub artist: String,
    pub artist_url: Option<String>,
    pub primary_artist_id: u64,
    pub url: String,
    pub lyrics: Vec<String>,
    pub lyrics_language: Option<String>,
    pub lyrics_created_at: Option<String>,
    pub lyrics_updated_at: Option<String>,
    pub lyrics_state: Option<String>,
    pub release_date: Option<String>,
    pub published: Option<bool>,
    pub recording_location: Option<String>,
    pub album_id: Option<u64>,
    pub album_title: Option<String>,
    pub album_artist_id: Option<u64>,
    pub album_href: Option<String>,
    pub produced_by: Option<Vec<ArtistRef>>,
    pub featuring: Option<Vec<ArtistRef>>,
    pub featured_artist_ids: Option<Vec<u64>>,
    pub tags: Vec<String>,
    pub ingested_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_roundtrip() {
        let stub = SongStub {
            song_id: 378195,
            url: "https://genius.com/Future-stick-talk-lyrics".into(),
            title: "Stick Talk".into(),
            primary_artist_id: 2197,
        };
        let json = serde_json::to_string(&stub).expect("serialize");
        let parsed: SongStub = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, stub);
    }

    #[test]
    fn enrichment_defaults_are_absent() {
        let e = Enrichment::default();
        assert!(e.language.is_none());
        assert!(e.producers.is_none());
        assert!(e.tags.is_empty());
    }

    #[test]
    fn record_serializes_nested_lists() {
        let record = SongRecord {
            song_id: 1,
            title: "Song".into(),
            title_with_featured: None,
            artist: "Artist".into(),
            artist_url: None,
            primary_artist_id: 9,
            url: "https://genius.com/song".into(),
            lyrics: vec!["line one".into(), String::new(), "line two".into()],
            lyrics_language: Some("en".into()),
            lyrics_created_at: None,
            lyrics_updated_at: None,
            lyrics_state: None,
            release_date: None,
            published: Some(true),
            recording_location: None,
            album_id: None,
            album_title: None,
            album_artist_id: None,
            album_href: None,
            produced_by: Some(vec![ArtistRef {
                id: 4,
                name: "Producer".into(),
                href: None,
            }]),
            featuring: None,
            featured_artist_ids: None,
            tags: vec!["rap".into()],
            ingested_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("\"lyrics\":[\"line one\",\"\",\"line two\"]"));
        assert!(json.contains("Producer"));
    }
}
