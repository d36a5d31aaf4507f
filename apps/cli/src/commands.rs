//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use lyricat_core::{IngestReport, Ingestor, ProgressReporter};
use lyricat_shared::{AppConfig, IngestSettings, expand_home, init_config, load_config};
use lyricat_storage::{Storage, export_csv};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// lyricat — build a local database of an artist's lyrics and metadata.
#[derive(Parser)]
#[command(
    name = "lyricat",
    version,
    about = "Scrape an artist's song catalog into a local lyrics database.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Ingest an artist's full catalog into the local database.
    Ingest {
        /// Artist identifier on the lyrics service.
        artist_id: u64,

        /// Database path (defaults to the configured db_path).
        #[arg(long)]
        db: Option<String>,

        /// Resume an interrupted run from its checkpoint.
        #[arg(long)]
        resume: bool,

        /// Records per storage flush.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Concurrent per-song fetch tasks.
        #[arg(long)]
        concurrency: Option<u32>,

        /// Minimum milliseconds between outbound requests.
        #[arg(long)]
        rate_limit_ms: Option<u64>,

        /// Override the service base URL.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Export an artist's stored songs to CSV.
    Export {
        /// Artist identifier on the lyrics service.
        artist_id: u64,

        /// Output CSV path.
        #[arg(short, long)]
        out: PathBuf,

        /// Database path (defaults to the configured db_path).
        #[arg(long)]
        db: Option<String>,
    },

    /// List an artist's stored songs.
    List {
        /// Artist identifier on the lyrics service.
        artist_id: u64,

        /// Database path (defaults to the configured db_path).
        #[arg(long)]
        db: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "lyricat=info",
        1 => "lyricat=debug",
        _ => "lyricat=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ingest {
            artist_id,
            db,
            resume,
            batch_size,
            concurrency,
            rate_limit_ms,
            base_url,
        } => {
            cmd_ingest(
                artist_id,
                db.as_deref(),
                resume,
                batch_size,
                concurrency,
                rate_limit_ms,
                base_url.as_deref(),
            )
            .await
        }
        Command::Export { artist_id, out, db } => cmd_export(artist_id, &out, db.as_deref()).await,
        Command::List { artist_id, db } => cmd_list(artist_id, db.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Resolve the database path from an optional flag and the loaded config.
fn resolve_db_path(flag: Option<&str>, config: &AppConfig) -> PathBuf {
    expand_home(flag.unwrap_or(&config.defaults.db_path))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn cmd_ingest(
    artist_id: u64,
    db: Option<&str>,
    resume: bool,
    batch_size: Option<usize>,
    concurrency: Option<u32>,
    rate_limit_ms: Option<u64>,
    base_url: Option<&str>,
) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_db_path(db, &config);

    // CLI flags override config file values
    let mut settings = IngestSettings::from(&config);
    if let Some(batch_size) = batch_size {
        settings.batch_size = batch_size;
    }
    if let Some(concurrency) = concurrency {
        settings.concurrency = concurrency;
    }
    if let Some(rate_limit_ms) = rate_limit_ms {
        settings.min_interval_ms = rate_limit_ms;
    }
    if let Some(base_url) = base_url {
        settings.base_url = base_url.to_string();
    }

    if settings.batch_size == 0 {
        return Err(eyre!("--batch-size must be at least 1"));
    }
    if settings.concurrency == 0 {
        return Err(eyre!("--concurrency must be at least 1"));
    }

    info!(
        artist_id,
        db = %db_path.display(),
        resume,
        "ingesting artist catalog"
    );

    let storage = Storage::open(&db_path).await?;
    let ingestor = Ingestor::new(settings)?;

    let reporter = CliProgress::new();
    let report = ingestor.ingest(artist_id, &storage, &reporter, resume).await?;
    reporter.finish();

    print_report(artist_id, &report);

    Ok(())
}

fn print_report(artist_id: u64, report: &IngestReport) {
    println!();
    println!("  Ingest complete for artist {artist_id}");
    println!("  Pages:          {}", report.pages_processed);
    println!("  Songs stored:   {}", report.songs_ingested);
    println!("  No lyrics:      {}", report.songs_without_lyrics);
    println!("  Already stored: {}", report.songs_already_stored);
    println!("  Failures:       {}", report.errors.len());
    println!("  Time:           {:.1}s", report.duration.as_secs_f64());
    println!();

    for (url, message) in &report.errors {
        println!("  failed: {url}: {message}");
    }
}

async fn cmd_export(artist_id: u64, out: &PathBuf, db: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_db_path(db, &config);

    let storage = Storage::open(&db_path).await?;
    let songs = storage.list_songs(artist_id).await?;

    if songs.is_empty() {
        return Err(eyre!(
            "no stored songs for artist {artist_id} in {}",
            db_path.display()
        ));
    }

    export_csv(&songs, out)?;
    println!("Exported {} songs to {}", songs.len(), out.display());

    Ok(())
}

async fn cmd_list(artist_id: u64, db: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_db_path(db, &config);

    let storage = Storage::open(&db_path).await?;
    let songs = storage.list_songs(artist_id).await?;

    if songs.is_empty() {
        println!("No stored songs for artist {artist_id}");
        return Ok(());
    }

    for song in &songs {
        let album = song.album_title.as_deref().unwrap_or("-");
        println!("  {:>9}  {:<40}  {}", song.song_id, song.title, album);
    }
    println!();
    println!("  {} songs for artist {artist_id}", songs.len());

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn page_started(&self, page: u32, songs: usize) {
        self.spinner
            .set_message(format!("Page {page}: {songs} songs"));
    }

    fn song_ingested(&self, title: &str) {
        self.spinner.set_message(format!("Ingested {title}"));
    }

    fn song_skipped(&self, url: &str, reason: &str) {
        self.spinner.set_message(format!("Skipped ({reason}) {url}"));
    }
}
