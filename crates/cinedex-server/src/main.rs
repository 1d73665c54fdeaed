//! Cinedex Server - Main entry point

use anyhow::Result;
use cinedex_common::logging::{init_logging, LogConfig};
use tracing::info;

use cinedex_server::{
    api,
    config::Config,
    db,
    ingest::{self, BulkLoader, LoadOutcome},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("cinedex-server")
        .filter_directives("cinedex_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;
    let _guard = init_logging(&log_config)?;

    info!("Starting Cinedex Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let pool = db::connect(&config.database, &config.wait).await?;
    info!("Database connection pool established");

    if config.ingest.on_startup {
        match BulkLoader::new(config.ingest.clone())?.run(&pool).await? {
            LoadOutcome::Skipped => info!("Dataset already loaded"),
            LoadOutcome::Loaded(report) => info!(
                titles = report.titles.inserted,
                ratings = report.ratings.inserted,
                "Dataset loaded in {:.1}s",
                report.duration_secs()
            ),
        }
    } else {
        info!("Ingestion is disabled (INGEST_ON_STARTUP=false)");
        ingest::storage::ensure_schema(&pool).await?;
    }

    api::serve(config, pool).await
}
