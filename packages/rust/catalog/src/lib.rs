//! Paginated artist catalog enumeration.
//!
//! The catalog listing API returns one page of song stubs at a time together
//! with a `next_page` cursor. Enumeration continues while `next_page` is an
//! integer and stops on the first `null`, absent, or non-integer value —
//! callers must never assume a fixed page count.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use lyricat_shared::net::{build_client, get_with_retry};
use lyricat_shared::{LyricatError, RateLimiter, Result, SongStub};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListingEnvelope {
    response: ListingResponse,
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    songs: Vec<ListedSong>,
    /// Integer while more pages remain; null/absent/other shapes terminate.
    #[serde(default)]
    next_page: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ListedSong {
    id: u64,
    url: String,
    title: String,
    primary_artist: ListedArtist,
}

#[derive(Debug, Deserialize)]
struct ListedArtist {
    id: u64,
}

// ---------------------------------------------------------------------------
// CatalogClient
// ---------------------------------------------------------------------------

/// Client for the artist song-listing endpoint.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
    limiter: RateLimiter,
}

impl CatalogClient {
    /// Create a new catalog client against `base_url`.
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

    /// Begin enumerating an artist's songs from page 1.
    ///
    /// The returned cursor is not restartable mid-sequence; a fresh call
    /// re-issues all page requests from page 1.
    pub fn pages(&self, artist_id: u64) -> SongPages<'_> {
        SongPages {
            client: self,
            artist_id,
            cursor: Some(1),
        }
    }

    /// Fetch one listing page. Returns the stubs plus the raw `next_page` value.
    #[instrument(skip(self))]
    async fn fetch_page(&self, artist_id: u64, page: u32) -> Result<ListingResponse> {
        let mut url = self
            .base_url
            .join(&format!("api/artists/{artist_id}/songs"))
            .map_err(|e| LyricatError::Transport(format!("bad listing URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("sort", "title");

        let body = get_with_retry(
            &self.client,
            &url,
            self.access_token.as_deref(),
            &self.limiter,
        )
        .await?;

        let envelope: ListingEnvelope = serde_json::from_str(&body).map_err(|e| {
            LyricatError::schema(format!("artist {artist_id} page {page}: malformed listing: {e}"))
        })?;

        debug!(
            songs = envelope.response.songs.len(),
            next_page = %envelope.response.next_page,
            "listing page fetched"
        );

        Ok(envelope.response)
    }
}

// ---------------------------------------------------------------------------
// SongPages
// ---------------------------------------------------------------------------

/// Page cursor over one artist's catalog. Finite, forward-only.
pub struct SongPages<'a> {
    client: &'a CatalogClient,
    artist_id: u64,
    /// Next page to request; `None` once the listing is exhausted.
    cursor: Option<u32>,
}

/// One fetched listing page.
#[derive(Debug, Clone)]
pub struct PageBatch {
    /// 1-based page number this batch came from.
    pub page: u32,
    /// Stubs in API order (sorted by title server-side).
    pub stubs: Vec<SongStub>,
}

impl SongPages<'_> {
    /// Fetch the next listing page, or `None` when the catalog is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<PageBatch>> {
        let Some(page) = self.cursor else {
            return Ok(None);
        };

        let response = self.client.fetch_page(self.artist_id, page).await?;

        // Sole termination condition: next_page must be an integer.
        self.cursor = match response.next_page.as_u64() {
            Some(next) => Some(next as u32),
            None => None,
        };

        let stubs = response
            .songs
            .into_iter()
            .map(|s| SongStub {
                song_id: s.id,
                url: s.url,
                title: s.title,
                primary_artist_id: s.primary_artist.id,
            })
            .collect::<Vec<_>>();

        info!(
            artist_id = self.artist_id,
            page,
            stubs = stubs.len(),
            more = self.cursor.is_some(),
            "catalog page enumerated"
        );

        Ok(Some(PageBatch { page, stubs }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing_body(songs: &[(u64, &str, &str, u64)], next_page: serde_json::Value) -> String {
        let songs: Vec<serde_json::Value> = songs
            .iter()
            .map(|(id, url, title, artist_id)| {
                serde_json::json!({
                    "id": id,
                    "url": url,
                    "title": title,
                    "primary_artist": { "id": artist_id }
                })
            })
            .collect();
        serde_json::json!({ "response": { "songs": songs, "next_page": next_page } }).to_string()
    }

    async fn client_for(server: &MockServer) -> CatalogClient {
        CatalogClient::new(&server.uri(), None, RateLimiter::from_millis(0)).expect("client")
    }

    #[tokio::test]
    async fn enumerates_until_non_integer_next_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/artists/2197/songs"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
                &[
                    (1, "https://genius.com/a", "Abracadabra", 2197),
                    (2, "https://genius.com/b", "Blow", 2197),
                ],
                serde_json::json!(2),
            )))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/artists/2197/songs"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
                &[(3, "https://genius.com/c", "Codeine Crazy", 2197)],
                serde_json::Value::Null,
            )))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut pages = client.pages(2197);

        let first = pages.next_page().await.unwrap().expect("page 1");
        assert_eq!(first.page, 1);
        assert_eq!(first.stubs.len(), 2);
        assert_eq!(first.stubs[0].title, "Abracadabra");
        assert_eq!(first.stubs[0].primary_artist_id, 2197);

        let second = pages.next_page().await.unwrap().expect("page 2");
        assert_eq!(second.page, 2);
        assert_eq!(second.stubs.len(), 1);

        assert!(pages.next_page().await.unwrap().is_none());
        // Exhausted cursors stay exhausted.
        assert!(pages.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn single_page_catalog() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/artists/88/songs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
                &[(10, "https://genius.com/x", "X", 88)],
                serde_json::Value::Null,
            )))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut pages = client.pages(88);

        let only = pages.next_page().await.unwrap().expect("page 1");
        assert_eq!(only.stubs.len(), 1);
        assert!(pages.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn string_next_page_terminates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/artists/5/songs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
                &[(1, "https://genius.com/a", "A", 5)],
                serde_json::json!(""),
            )))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut pages = client.pages(5);
        assert!(pages.next_page().await.unwrap().is_some());
        assert!(pages.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_song_catalog_yields_one_empty_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/artists/7/songs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing_body(&[], serde_json::Value::Null)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut pages = client.pages(7);

        let only = pages.next_page().await.unwrap().expect("page 1");
        assert!(only.stubs.is_empty());
        assert!(pages.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/artists/9/songs"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/artists/9/songs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
                &[(1, "https://genius.com/a", "A", 9)],
                serde_json::Value::Null,
            )))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut pages = client.pages(9);
        let batch = pages.next_page().await.unwrap().expect("page after retry");
        assert_eq!(batch.stubs.len(), 1);
    }

    #[tokio::test]
    async fn persistent_failure_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/artists/9/songs"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut pages = client.pages(9);
        let err = pages.next_page().await.unwrap_err();
        assert!(matches!(err, LyricatError::Transport(_)));
    }

    #[tokio::test]
    async fn not_found_fails_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/artists/404/songs"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut pages = client.pages(404);
        assert!(pages.next_page().await.is_err());
    }

    #[tokio::test]
    async fn malformed_listing_is_schema_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/artists/3/songs"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"response\": 42}"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut pages = client.pages(3);
        let err = pages.next_page().await.unwrap_err();
        assert!(matches!(err, LyricatError::Schema { .. }));
    }
}
