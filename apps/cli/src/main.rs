//! lyricat CLI — artist lyric catalog ingestion tool.
//!
//! Scrapes an artist's full song catalog, merges lyrics with per-song
//! metadata, and stores everything in a local database.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
