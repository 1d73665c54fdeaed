//! Cinedex bootstrap - wait for the database, load the IMDb dataset, exit
//!
//! Usage:
//!   cinedex-bootstrap [--force] [--data-dir DIR] [--batch-size N]

use anyhow::Result;
use cinedex_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use cinedex_server::{
    config::Config,
    db,
    ingest::{BulkLoader, LoadOutcome},
};

#[derive(Parser, Debug)]
#[command(name = "cinedex-bootstrap")]
#[command(author, version, about = "Load the IMDb title and rating datasets into PostgreSQL")]
struct Cli {
    /// Load even if both tables already hold data (existing rows are kept)
    #[arg(long)]
    force: bool,

    /// Directory for downloaded and decompressed files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Rows per INSERT statement
    #[arg(long)]
    batch_size: Option<usize>,

    /// Override the title basics dataset URL
    #[arg(long)]
    titles_url: Option<String>,

    /// Override the ratings dataset URL
    #[arg(long)]
    ratings_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("cinedex-bootstrap")
        .build()
        .merge_env()?;
    let _guard = init_logging(&log_config)?;

    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.ingest.data_dir = dir;
    }
    if let Some(size) = cli.batch_size {
        config.ingest.batch_size = size;
    }
    if let Some(url) = cli.titles_url {
        config.ingest.titles_url = url;
    }
    if let Some(url) = cli.ratings_url {
        config.ingest.ratings_url = url;
    }
    config.ingest.validate()?;

    let pool = db::connect(&config.database, &config.wait).await?;

    let outcome = BulkLoader::new(config.ingest)?
        .force(cli.force)
        .run(&pool)
        .await?;

    match outcome {
        LoadOutcome::Skipped => info!("Tables already populated, nothing to do"),
        LoadOutcome::Loaded(report) => info!(
            titles_read = report.titles.read,
            titles_inserted = report.titles.inserted,
            ratings_read = report.ratings.read,
            ratings_inserted = report.ratings.inserted,
            "Bootstrap complete in {:.1}s",
            report.duration_secs()
        ),
    }

    pool.close().await;
    Ok(())
}
