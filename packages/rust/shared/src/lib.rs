//! Shared types, error model, and configuration for lyricat.
//!
//! This crate is the foundation depended on by all other lyricat crates.
//! It provides:
//! - [`LyricatError`] — the unified error type
//! - Domain types ([`SongStub`], [`Extraction`], [`Enrichment`], [`SongRecord`])
//! - Configuration ([`AppConfig`], [`IngestSettings`], config loading)
//! - [`RateLimiter`] — request pacing shared by all outbound calls

pub mod config;
pub mod error;
pub mod limit;
pub mod net;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, GeniusConfig, IngestSettings, RateLimitConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from,
};
pub use error::{LyricatError, Result};
pub use limit::RateLimiter;
pub use types::{AlbumRef, ArtistRef, Enrichment, Extraction, ScrapedSong, SongRecord, SongStub};
