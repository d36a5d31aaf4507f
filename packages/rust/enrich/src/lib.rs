//! Per-song metadata enrichment from the detail API.
//!
//! One round-trip per song: `GET {base}/api/songs/{id}` returns the full
//! detail payload, from which a fixed set of fields is extracted. Several
//! fields fall back to the payload's tracking-event list — a generic
//! key/value list — and every tracking lookup is optional: absence yields
//! `None`, never an error.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use lyricat_shared::net::{build_client, get_with_retry};
use lyricat_shared::{AlbumRef, ArtistRef, Enrichment, LyricatError, RateLimiter, Result};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    response: DetailResponse,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    song: DetailSong,
}

#[derive(Debug, Deserialize)]
struct DetailSong {
    release_date: Option<String>,
    published: Option<bool>,
    recording_location: Option<String>,
    title_with_featured: Option<String>,
    album: Option<DetailAlbum>,
    producer_artists: Option<Vec<DetailArtist>>,
    featured_artists: Option<Vec<DetailArtist>>,
    tags: Option<Vec<DetailTag>>,
    #[serde(default)]
    tracking_data: Vec<TrackingEvent>,
    /// Unix timestamp or formatted string depending on API vintage.
    lyrics_updated_at: Option<serde_json::Value>,
    lyrics_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailAlbum {
    id: Option<u64>,
    name: Option<String>,
    url: Option<String>,
    artist: Option<DetailArtist>,
}

#[derive(Debug, Deserialize)]
struct DetailArtist {
    id: u64,
    name: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailTag {
    name: String,
}

/// One entry of the generic tracking-event list.
#[derive(Debug, Deserialize)]
struct TrackingEvent {
    key: String,
    #[serde(default)]
    value: serde_json::Value,
}

// ---------------------------------------------------------------------------
// DetailClient
// ---------------------------------------------------------------------------

/// Client for the per-song detail endpoint.
#[derive(Debug, Clone)]
pub struct DetailClient {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
    limiter: RateLimiter,
}

impl DetailClient {
    /// Create a new detail client against `base_url`.
    pub fn new(base_url: &str, access_token: Option<String>, limiter: RateLimiter) -> Result<Self> {
        let client = build_client()?;

        let base_url = Url::parse(base_url)
            .map_err(|e| LyricatError::config(format!("invalid base URL {base_url:?}: {e}")))?;

        Ok(Self {
            client,
            base_url,
            access_token,
            limiter,
        })
    }

    /// Fetch and extract enrichment fields for one song.
    #[instrument(skip(self))]
    pub async fn enrich(&self, song_id: u64) -> Result<Enrichment> {
        let url = self
            .base_url
            .join(&format!("api/songs/{song_id}"))
            .map_err(|e| LyricatError::Transport(format!("bad detail URL: {e}")))?;

        let body = get_with_retry(
            &self.client,
            &url,
            self.access_token.as_deref(),
            &self.limiter,
        )
        .await?;

        let envelope: DetailEnvelope = serde_json::from_str(&body).map_err(|e| {
            LyricatError::schema(format!("song {song_id}: malformed detail payload: {e}"))
        })?;

        let enrichment = extract_fields(envelope.response.song);
        debug!(song_id, tags = enrichment.tags.len(), "song enriched");

        Ok(enrichment)
    }
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

/// Map the detail payload onto [`Enrichment`].
///
/// List-derived fields keep the absent/empty distinction: a missing source
/// list yields `None`, a present-but-empty list yields `Some(vec![])`.
fn extract_fields(song: DetailSong) -> Enrichment {
    let language = tracking_value(&song.tracking_data, "Lyrics Language");
    let lyrics_created_at = tracking_value(&song.tracking_data, "created_at");
    let tags = resolve_tags(&song);

    let album = song.album.map(|album| AlbumRef {
        album_id: album.id,
        title: album.name,
        artist_id: album.artist.map(|artist| artist.id),
        href: album.url,
    });

    let producers = song.producer_artists.map(artist_refs);
    let featured_artist_ids = song
        .featured_artists
        .as_ref()
        .map(|artists| artists.iter().map(|a| a.id).collect());
    let featuring = song.featured_artists.map(artist_refs);

    Enrichment {
        release_date: song.release_date,
        published: song.published,
        recording_location: song.recording_location,
        title_with_featured: song.title_with_featured,
        album,
        producers,
        featuring,
        featured_artist_ids,
        language,
        lyrics_created_at,
        lyrics_updated_at: song.lyrics_updated_at.as_ref().and_then(value_to_string),
        lyrics_state: song.lyrics_state,
        tags,
    }
}

/// Tags prefer the explicit list; an absent or empty explicit list falls
/// back to tracking "Tag" entries. Absence of both yields an empty list.
fn resolve_tags(song: &DetailSong) -> Vec<String> {
    if let Some(tags) = &song.tags {
        if !tags.is_empty() {
            return tags.iter().map(|t| t.name.clone()).collect();
        }
    }

    song.tracking_data
        .iter()
        .filter(|event| event.key == "Tag")
        .filter_map(|event| value_to_string(&event.value))
        .collect()
}

/// First tracking entry matching `key`, as a string. Absence is not an error.
fn tracking_value(events: &[TrackingEvent], key: &str) -> Option<String> {
    events
        .iter()
        .find(|event| event.key == key)
        .and_then(|event| value_to_string(&event.value))
}

/// Stringify a scalar JSON value; null and compound shapes yield `None`.
fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn artist_refs(artists: Vec<DetailArtist>) -> Vec<ArtistRef> {
    artists
        .into_iter()
        .map(|artist| ArtistRef {
            id: artist.id,
            name: artist.name.unwrap_or_default(),
            href: artist.url,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn song_from(json: serde_json::Value) -> DetailSong {
        serde_json::from_value(json).expect("valid detail song")
    }

    fn full_payload() -> serde_json::Value {
        serde_json::json!({
            "release_date": "2015-07-17",
            "published": true,
            "recording_location": "Atlanta, GA",
            "title_with_featured": "Blow a Bag (Ft. Example)",
            "album": {
                "id": 104463,
                "name": "DS2",
                "url": "https://genius.com/albums/Future/Ds2",
                "artist": { "id": 2197, "name": "Future", "url": "https://genius.com/artists/Future" }
            },
            "producer_artists": [
                { "id": 8, "name": "Metro Boomin", "url": "https://genius.com/artists/Metro-boomin" },
                { "id": 9, "name": "Southside", "url": "https://genius.com/artists/Southside" }
            ],
            "featured_artists": [
                { "id": 77, "name": "Example", "url": "https://genius.com/artists/Example" }
            ],
            "tags": [ { "name": "rap" }, { "name": "trap" } ],
            "tracking_data": [
                { "key": "Lyrics Language", "value": "en" },
                { "key": "created_at", "value": "2015-07-13" },
                { "key": "Tag", "value": "ignored-when-explicit" }
            ],
            "lyrics_updated_at": 1437100000,
            "lyrics_state": "complete"
        })
    }

    #[test]
    fn extracts_all_fields() {
        let e = extract_fields(song_from(full_payload()));

        assert_eq!(e.release_date.as_deref(), Some("2015-07-17"));
        assert_eq!(e.published, Some(true));
        assert_eq!(e.recording_location.as_deref(), Some("Atlanta, GA"));
        assert_eq!(e.title_with_featured.as_deref(), Some("Blow a Bag (Ft. Example)"));

        let album = e.album.expect("album");
        assert_eq!(album.album_id, Some(104463));
        assert_eq!(album.title.as_deref(), Some("DS2"));
        assert_eq!(album.artist_id, Some(2197));
        assert_eq!(album.href.as_deref(), Some("https://genius.com/albums/Future/Ds2"));

        let producers = e.producers.expect("producers");
        assert_eq!(producers.len(), 2);
        assert_eq!(producers[0].name, "Metro Boomin");

        assert_eq!(e.featured_artist_ids, Some(vec![77]));
        assert_eq!(e.featuring.expect("featuring")[0].name, "Example");

        assert_eq!(e.language.as_deref(), Some("en"));
        assert_eq!(e.lyrics_created_at.as_deref(), Some("2015-07-13"));
        assert_eq!(e.lyrics_updated_at.as_deref(), Some("1437100000"));
        assert_eq!(e.lyrics_state.as_deref(), Some("complete"));
    }

    #[test]
    fn explicit_tags_win_over_tracking() {
        let e = extract_fields(song_from(full_payload()));
        assert_eq!(e.tags, vec!["rap", "trap"]);
    }

    #[test]
    fn tags_fall_back_to_tracking_entries() {
        let e = extract_fields(song_from(serde_json::json!({
            "tracking_data": [
                { "key": "Tag", "value": "rap" },
                { "key": "Lyrics Language", "value": "en" },
                { "key": "Tag", "value": "atlanta" }
            ]
        })));
        assert_eq!(e.tags, vec!["rap", "atlanta"]);
    }

    #[test]
    fn empty_explicit_tags_fall_back_to_tracking() {
        let e = extract_fields(song_from(serde_json::json!({
            "tags": [],
            "tracking_data": [ { "key": "Tag", "value": "rap" } ]
        })));
        assert_eq!(e.tags, vec!["rap"]);
    }

    #[test]
    fn no_tag_source_yields_empty_list() {
        let e = extract_fields(song_from(serde_json::json!({})));
        assert!(e.tags.is_empty());
    }

    #[test]
    fn missing_language_entry_is_none_not_error() {
        let e = extract_fields(song_from(serde_json::json!({
            "tracking_data": [ { "key": "Tag", "value": "rap" } ]
        })));
        assert!(e.language.is_none());
        assert!(e.lyrics_created_at.is_none());
    }

    #[test]
    fn absent_lists_stay_none_empty_lists_stay_some() {
        let absent = extract_fields(song_from(serde_json::json!({})));
        assert!(absent.producers.is_none());
        assert!(absent.featuring.is_none());
        assert!(absent.featured_artist_ids.is_none());

        let empty = extract_fields(song_from(serde_json::json!({
            "producer_artists": [],
            "featured_artists": []
        })));
        assert_eq!(empty.producers, Some(vec![]));
        assert_eq!(empty.featuring, Some(vec![]));
        assert_eq!(empty.featured_artist_ids, Some(vec![]));
    }

    #[test]
    fn missing_album_nulls_the_group() {
        let e = extract_fields(song_from(serde_json::json!({})));
        assert!(e.album.is_none());
    }

    #[test]
    fn album_without_artist_block() {
        let e = extract_fields(song_from(serde_json::json!({
            "album": { "id": 5, "name": "Single", "url": "https://genius.com/albums/5" }
        })));
        let album = e.album.expect("album");
        assert_eq!(album.album_id, Some(5));
        assert!(album.artist_id.is_none());
    }

    #[tokio::test]
    async fn enrich_round_trip() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/songs/378195"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                serde_json::json!({ "response": { "song": full_payload() } }).to_string(),
            ))
            .mount(&server)
            .await;

        let client =
            DetailClient::new(&server.uri(), None, RateLimiter::from_millis(0)).expect("client");
        let e = client.enrich(378195).await.expect("enrich");
        assert_eq!(e.language.as_deref(), Some("en"));
        assert_eq!(e.tags.len(), 2);
    }

    #[tokio::test]
    async fn malformed_payload_is_schema_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/songs/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"response\": {}}"))
            .mount(&server)
            .await;

        let client =
            DetailClient::new(&server.uri(), None, RateLimiter::from_millis(0)).expect("client");
        let err = client.enrich(1).await.unwrap_err();
        assert!(matches!(err, LyricatError::Schema { .. }));
    }

    #[tokio::test]
    async fn transport_failure_surfaces_after_retries() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/songs/2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client =
            DetailClient::new(&server.uri(), None, RateLimiter::from_millis(0)).expect("client");
        let err = client.enrich(2).await.unwrap_err();
        assert!(matches!(err, LyricatError::Transport(_)));
    }
}
