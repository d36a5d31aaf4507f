//! CSV export for stored song records.
//!
//! Nested columns (lyrics, credits, tags) are serialized as JSON text so the
//! file stays one row per song and loads cleanly into spreadsheet tools.

use std::path::Path;

use lyricat_shared::{LyricatError, Result, SongRecord};

const HEADERS: [&str; 24] = [
    "song_id",
    "title",
    "title_with_featured",
    "artist",
    "artist_url",
    "primary_artist_id",
    "url",
    "lyrics",
    "lyrics_language",
    "lyrics_created_at",
    "lyrics_updated_at",
    "lyrics_state",
    "release_date",
    "published",
    "recording_location",
    "album_id",
    "album_title",
    "album_artist_id",
    "album_href",
    "produced_by",
    "featuring",
    "featured_artist_ids",
    "tags",
    "ingested_at",
];

/// Write `records` to a CSV file at `path`, one row per song.
pub fn export_csv(records: &[SongRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LyricatError::io(parent, e))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| LyricatError::io(path, csv_io(e)))?;

    writer
        .write_record(HEADERS)
        .map_err(|e| LyricatError::io(path, csv_io(e)))?;

    for record in records {
        let row = record_to_row(record)?;
        writer
            .write_record(&row)
            .map_err(|e| LyricatError::io(path, csv_io(e)))?;
    }

    writer.flush().map_err(|e| LyricatError::io(path, e))?;
    tracing::info!(path = %path.display(), rows = records.len(), "wrote csv export");
    Ok(())
}

fn record_to_row(record: &SongRecord) -> Result<Vec<String>> {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let opt_num = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_default();

    Ok(vec![
        record.song_id.to_string(),
        record.title.clone(),
        opt(&record.title_with_featured),
        record.artist.clone(),
        opt(&record.artist_url),
        record.primary_artist_id.to_string(),
        record.url.clone(),
        to_json(&record.lyrics)?,
        opt(&record.lyrics_language),
        opt(&record.lyrics_created_at),
        opt(&record.lyrics_updated_at),
        opt(&record.lyrics_state),
        opt(&record.release_date),
        record
            .published
            .map(|p| p.to_string())
            .unwrap_or_default(),
        opt(&record.recording_location),
        opt_num(record.album_id),
        opt(&record.album_title),
        opt_num(record.album_artist_id),
        opt(&record.album_href),
        optional_json(&record.produced_by)?,
        optional_json(&record.featuring)?,
        optional_json(&record.featured_artist_ids)?,
        to_json(&record.tags)?,
        record.ingested_at.to_rfc3339(),
    ])
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| LyricatError::Storage(e.to_string()))
}

fn optional_json<T: serde::Serialize>(value: &Option<T>) -> Result<String> {
    match value {
        Some(v) => to_json(v),
        None => Ok(String::new()),
    }
}

fn csv_io(e: csv::Error) -> std::io::Error {
    std::io::Error::other(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lyricat_shared::ArtistRef;
    use uuid::Uuid;

    fn sample() -> SongRecord {
        SongRecord {
            song_id: 90478,
            title: "Blow a Bag".into(),
            title_with_featured: Some("Blow a Bag".into()),
            artist: "Future".into(),
            artist_url: Some("https://genius.com/artists/Future".into()),
            primary_artist_id: 2197,
            url: "https://genius.com/Future-blow-a-bag-lyrics".into(),
            lyrics: vec!["line one".into(), String::new(), "line, with comma".into()],
            lyrics_language: Some("en".into()),
            lyrics_created_at: Some("2015-07-13".into()),
            lyrics_updated_at: None,
            lyrics_state: Some("complete".into()),
            release_date: Some("2015-07-17".into()),
            published: Some(true),
            recording_location: None,
            album_id: Some(104463),
            album_title: Some("DS2".into()),
            album_artist_id: Some(2197),
            album_href: None,
            produced_by: Some(vec![ArtistRef {
                id: 8,
                name: "Metro Boomin".into(),
                href: Some("https://genius.com/artists/Metro-boomin".into()),
            }]),
            featuring: None,
            featured_artist_ids: None,
            tags: vec!["rap".into()],
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn export_writes_header_and_rows() {
        let path = std::env::temp_dir().join(format!("lyricat_export_{}.csv", Uuid::now_v7()));
        export_csv(&[sample()], &path).expect("export");

        let contents = std::fs::read_to_string(&path).expect("read back");
        let mut lines = contents.lines();
        let header = lines.next().expect("header row");
        assert!(header.starts_with("song_id,title,"));
        assert_eq!(lines.count(), 1);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn nested_fields_are_json() {
        let path = std::env::temp_dir().join(format!("lyricat_export_{}.csv", Uuid::now_v7()));
        export_csv(&[sample()], &path).expect("export");

        let mut reader = csv::Reader::from_path(&path).expect("open csv");
        let row = reader.records().next().expect("one row").expect("valid row");

        let lyrics: Vec<String> = serde_json::from_str(&row[7]).expect("lyrics json");
        assert_eq!(lyrics.len(), 3);
        assert_eq!(lyrics[2], "line, with comma");

        let produced: Vec<ArtistRef> = serde_json::from_str(&row[19]).expect("produced json");
        assert_eq!(produced[0].name, "Metro Boomin");

        // Absent optional lists come out as empty cells
        assert_eq!(&row[20], "");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn empty_export_still_has_header() {
        let path = std::env::temp_dir().join(format!("lyricat_export_{}.csv", Uuid::now_v7()));
        export_csv(&[], &path).expect("export");

        let contents = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(contents.lines().count(), 1);

        std::fs::remove_file(&path).ok();
    }
}
