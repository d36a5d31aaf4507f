//! Concurrent artist ingestion pipeline.
//!
//! Drives the full flow for one artist: enumerate catalog pages, then for
//! each listed song fetch the lyrics page, extract, enrich from the detail
//! API, merge, and persist in batches. Per-song failures are isolated —
//! recorded and skipped — while catalog-page and storage failures abort the
//! run. A page-level checkpoint plus the stored song set make interrupted
//! runs resumable.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use lyricat_catalog::CatalogClient;
use lyricat_enrich::DetailClient;
use lyricat_shared::net::{build_client, get_with_retry};
use lyricat_shared::{IngestSettings, LyricatError, RateLimiter, Result, SongRecord, SongStub};
use lyricat_storage::Storage;

use crate::merge::merge;
use crate::progress::ProgressReporter;

// ---------------------------------------------------------------------------
// IngestReport
// ---------------------------------------------------------------------------

/// Summary of a completed ingest run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Ingest job row id.
    pub job_id: String,
    /// Catalog pages enumerated (including pages skipped via checkpoint).
    pub pages_processed: usize,
    /// Songs merged and persisted this run.
    pub songs_ingested: usize,
    /// Songs skipped because the page carried no lyrics.
    pub songs_without_lyrics: usize,
    /// Songs skipped because a prior run already stored them.
    pub songs_already_stored: usize,
    /// Per-song failures (url, error message). Never aborts the run.
    pub errors: Vec<(String, String)>,
    /// Total wall-clock duration.
    pub duration: Duration,
}

/// Outcome of one per-song task.
enum SongOutcome {
    Record(Box<SongRecord>),
    NoLyrics { url: String },
}

// ---------------------------------------------------------------------------
// Ingestor
// ---------------------------------------------------------------------------

/// Artist ingestion driver. One instance per configured service endpoint.
pub struct Ingestor {
    settings: IngestSettings,
    catalog: CatalogClient,
    detail: DetailClient,
    /// Plain client for lyrics page HTML (no bearer token).
    page_client: Client,
    limiter: RateLimiter,
}

impl Ingestor {
    /// Create a new ingestor from merged runtime settings.
    pub fn new(settings: IngestSettings) -> Result<Self> {
        // One limiter shared by listing, page, and detail requests, so the
        // minimum interval holds across all outbound traffic.
        let limiter = RateLimiter::from_millis(settings.min_interval_ms);

        let catalog = CatalogClient::new(
            &settings.base_url,
            settings.access_token.clone(),
            limiter.clone(),
        )?;
        let detail = DetailClient::new(
            &settings.base_url,
            settings.access_token.clone(),
            limiter.clone(),
        )?;
        let page_client = build_client()?;

        Ok(Self {
            settings,
            catalog,
            detail,
            page_client,
            limiter,
        })
    }

    /// Ingest one artist's full catalog into `storage`.
    ///
    /// With `resume`, pages at or below the stored checkpoint are skipped and
    /// already-stored songs are not re-fetched. The checkpoint only advances
    /// while every song so far has been persisted or skipped as lyric-less;
    /// it stalls at the first page with a per-song failure, so a resumed run
    /// re-walks that page and retries the failed songs. Catalog-page failures
    /// (after retries) and storage failures abort; everything per-song is
    /// isolated.
    #[instrument(skip(self, storage, progress))]
    pub async fn ingest(
        &self,
        artist_id: u64,
        storage: &Storage,
        progress: &dyn ProgressReporter,
        resume: bool,
    ) -> Result<IngestReport> {
        let start_time = std::time::Instant::now();

        let job_id = storage.insert_ingest_job(artist_id).await?;

        let checkpoint = if resume {
            storage.get_checkpoint(artist_id).await?
        } else {
            None
        };
        let processed: HashSet<u64> = if resume {
            storage.processed_song_ids(artist_id).await?
        } else {
            HashSet::new()
        };

        info!(
            artist_id,
            concurrency = self.settings.concurrency,
            batch_size = self.settings.batch_size,
            checkpoint = ?checkpoint,
            already_stored = processed.len(),
            "starting ingest"
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency as usize));

        let mut pages_processed = 0usize;
        let mut songs_ingested = 0usize;
        let mut songs_without_lyrics = 0usize;
        let mut songs_already_stored = 0usize;
        let mut errors: Vec<(String, String)> = Vec::new();
        // Once a page records a per-song failure the checkpoint stops
        // advancing, so that page is re-walked on resume.
        let mut checkpoint_stalled = false;

        let mut pages = self.catalog.pages(artist_id);
        while let Some(batch) = pages.next_page().await? {
            pages_processed += 1;

            if let Some(last_page) = checkpoint {
                if batch.page <= last_page {
                    debug!(page = batch.page, "page below checkpoint, skipping");
                    progress.page_started(batch.page, 0);
                    continue;
                }
            }

            progress.page_started(batch.page, batch.stubs.len());

            let errors_before = errors.len();
            let mut handles = Vec::new();
            for stub in batch.stubs {
                if processed.contains(&stub.song_id) {
                    songs_already_stored += 1;
                    progress.song_skipped(&stub.url, "already stored");
                    continue;
                }

                let sem = semaphore.clone();
                let page_client = self.page_client.clone();
                let detail = self.detail.clone();
                let limiter = self.limiter.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = sem.acquire().await.expect("semaphore closed");
                    let outcome =
                        process_song(&page_client, &detail, &limiter, &stub).await;
                    (stub, outcome)
                }));
            }

            let mut records: Vec<SongRecord> = Vec::new();
            for handle in handles {
                let (stub, outcome) = handle
                    .await
                    .map_err(|e| LyricatError::Transport(format!("song task panicked: {e}")))?;

                match outcome {
                    Ok(SongOutcome::Record(record)) => {
                        progress.song_ingested(&record.title);
                        records.push(*record);
                    }
                    Ok(SongOutcome::NoLyrics { url }) => {
                        debug!(%url, "no lyrics, skipping");
                        progress.song_skipped(&url, "no lyrics");
                        songs_without_lyrics += 1;
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(url = %stub.url, error = %e, "song failed, skipping");
                        progress.song_skipped(&stub.url, "error");
                        errors.push((stub.url, e.to_string()));
                    }
                }
            }

            // Flush everything from this page before advancing the checkpoint,
            // so a checkpointed page is never partially persisted.
            for chunk in records.chunks(self.settings.batch_size) {
                storage.upsert_songs(chunk).await?;
                songs_ingested += chunk.len();
            }

            if errors.len() > errors_before {
                checkpoint_stalled = true;
            }
            if !checkpoint_stalled {
                storage.set_checkpoint(artist_id, batch.page).await?;
            }
        }

        let duration = start_time.elapsed();

        let stats = serde_json::json!({
            "status": if errors.is_empty() { "completed" } else { "completed_with_errors" },
            "pages_processed": pages_processed,
            "songs_ingested": songs_ingested,
            "songs_without_lyrics": songs_without_lyrics,
            "songs_already_stored": songs_already_stored,
            "errors": errors.len(),
        });
        storage.update_ingest_job(&job_id, &stats.to_string()).await?;

        let report = IngestReport {
            job_id,
            pages_processed,
            songs_ingested,
            songs_without_lyrics,
            songs_already_stored,
            errors,
            duration,
        };

        info!(
            pages = report.pages_processed,
            ingested = report.songs_ingested,
            no_lyrics = report.songs_without_lyrics,
            already_stored = report.songs_already_stored,
            errors = report.errors.len(),
            duration_ms = report.duration.as_millis(),
            "ingest completed"
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Per-song work
// ---------------------------------------------------------------------------

/// Fetch, extract, enrich, and merge one song.
async fn process_song(
    page_client: &Client,
    detail: &DetailClient,
    limiter: &RateLimiter,
    stub: &SongStub,
) -> Result<SongOutcome> {
    let page_url = Url::parse(&stub.url)
        .map_err(|e| LyricatError::parse(format!("bad song url {:?}: {e}", stub.url)))?;

    let html = get_with_retry(page_client, &page_url, None, limiter).await?;

    let extraction = lyricat_extract::extract(&html, &stub.url)?;
    if matches!(extraction, lyricat_shared::Extraction::NoLyrics) {
        // Skip the detail round-trip for songs that will not be persisted.
        return Ok(SongOutcome::NoLyrics {
            url: stub.url.clone(),
        });
    }

    let enrichment = detail.enrich(stub.song_id).await?;

    match merge(stub, extraction, enrichment, Utc::now()) {
        Some(record) => Ok(SongOutcome::Record(Box::new(record))),
        None => Ok(SongOutcome::NoLyrics {
            url: stub.url.clone(),
        }),
    }
}
