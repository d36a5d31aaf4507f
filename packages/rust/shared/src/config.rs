//! Application configuration for lyricat.
//!
//! User config lives at `~/.lyricat/lyricat.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LyricatError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "lyricat.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".lyricat";

// ---------------------------------------------------------------------------
// Config structs (matching lyricat.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Lyrics service settings.
    #[serde(default)]
    pub genius: GeniusConfig,

    /// Request pacing.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the local song database.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Number of records per storage flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Concurrent per-song fetch tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_db_path() -> String {
    "~/.lyricat/songs.db".into()
}
fn default_batch_size() -> usize {
    30
}
fn default_concurrency() -> u32 {
    4
}

/// `[genius]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeniusConfig {
    /// Base URL of the lyrics service (tests point this at a mock server).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the access token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for GeniusConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
        }
    }
}

fn default_base_url() -> String {
    "https://genius.com".into()
}
fn default_token_env() -> String {
    "GENIUS_ACCESS_TOKEN".into()
}

/// `[rate_limit]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Minimum ms between any two outbound requests.
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval(),
        }
    }
}

fn default_min_interval() -> u64 {
    1000
}

// ---------------------------------------------------------------------------
// Ingest config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime ingest configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Base URL of the lyrics service.
    pub base_url: String,
    /// Bearer token for the detail/listing APIs, if available.
    pub access_token: Option<String>,
    /// Records per storage flush.
    pub batch_size: usize,
    /// Concurrent per-song tasks.
    pub concurrency: u32,
    /// Minimum ms between outbound requests.
    pub min_interval_ms: u64,
}

impl From<&AppConfig> for IngestSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.genius.base_url.clone(),
            access_token: std::env::var(&config.genius.token_env).ok().filter(|t| !t.is_empty()),
            batch_size: config.defaults.batch_size,
            concurrency: config.defaults.concurrency,
            min_interval_ms: config.rate_limit.min_interval_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.lyricat/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LyricatError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.lyricat/lyricat.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LyricatError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LyricatError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LyricatError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LyricatError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LyricatError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve a possibly `~`-prefixed path against the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
