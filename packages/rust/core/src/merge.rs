//! Merge of the three per-song sources into one flat record.
//!
//! Precedence where sources overlap: enrichment > extraction > stub. The
//! extraction carries the page it was actually fetched from, so its URL and
//! title win over the listing stub's copies.

use chrono::{DateTime, Utc};

use lyricat_shared::{Enrichment, Extraction, SongRecord, SongStub};

/// Build a [`SongRecord`] from one song's stub, extraction, and enrichment.
///
/// Returns `None` when the page carried no qualifying lyrics — such songs
/// are skipped entirely and never persisted.
pub fn merge(
    stub: &SongStub,
    extraction: Extraction,
    enrichment: Enrichment,
    ingested_at: DateTime<Utc>,
) -> Option<SongRecord> {
    let scraped = match extraction {
        Extraction::Song(scraped) => scraped,
        Extraction::NoLyrics => return None,
    };

    let (album_id, album_title, album_artist_id, album_href) = match enrichment.album {
        Some(album) => (album.album_id, album.title, album.artist_id, album.href),
        None => (None, None, None, None),
    };

    Some(SongRecord {
        song_id: stub.song_id,
        title: scraped.title,
        title_with_featured: enrichment.title_with_featured,
        artist: scraped.artist,
        artist_url: scraped.artist_url,
        primary_artist_id: stub.primary_artist_id,
        url: scraped.url,
        lyrics: scraped.lines,
        lyrics_language: enrichment.language,
        lyrics_created_at: enrichment.lyrics_created_at,
        lyrics_updated_at: enrichment.lyrics_updated_at,
        lyrics_state: enrichment.lyrics_state,
        release_date: enrichment.release_date,
        published: enrichment.published,
        recording_location: enrichment.recording_location,
        album_id,
        album_title,
        album_artist_id,
        album_href,
        produced_by: enrichment.producers,
        featuring: enrichment.featuring,
        featured_artist_ids: enrichment.featured_artist_ids,
        tags: enrichment.tags,
        ingested_at,
    })
}
