//! Progress reporting seam between the pipeline and its callers.
//!
//! The CLI plugs an indicatif-backed reporter in here; tests and library
//! callers use [`SilentProgress`].

/// Callbacks emitted as an ingest run advances.
pub trait ProgressReporter: Send + Sync {
    /// A catalog page was fetched and its songs are about to be processed.
    fn page_started(&self, page: u32, songs: usize);

    /// One song was merged and queued for storage.
    fn song_ingested(&self, title: &str);

    /// One song was skipped (no lyrics, already stored, or failed).
    fn song_skipped(&self, url: &str, reason: &str);
}

/// No-op reporter.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn page_started(&self, _page: u32, _songs: usize) {}
    fn song_ingested(&self, _title: &str) {}
    fn song_skipped(&self, _url: &str, _reason: &str) {}
}
