//! Ingestion configuration
//!
//! Where the IMDb dataset files come from, where they are kept locally and how
//! they are written to the database.

use cinedex_common::env_or;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default IMDb title basics dataset.
pub const DEFAULT_TITLES_URL: &str = "https://datasets.imdbws.com/title.basics.tsv.gz";

/// Default IMDb ratings dataset.
pub const DEFAULT_RATINGS_URL: &str = "https://datasets.imdbws.com/title.ratings.tsv.gz";

/// Default scratch directory for downloaded and decompressed files.
pub const DEFAULT_DATA_DIR: &str = "data/raw";

/// Only title records of this `titleType` are loaded.
pub const DEFAULT_TITLE_KIND: &str = "movie";

/// Rows per multi-row INSERT statement.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Postgres accepts at most 65535 bind parameters per statement and a title
/// row binds 9 of them.
pub const MAX_BATCH_SIZE: usize = u16::MAX as usize / 9;

/// Transport timeout for a whole download in seconds (the files are large).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Run the bulk load before the server starts accepting requests
    pub on_startup: bool,
    pub data_dir: PathBuf,
    pub titles_url: String,
    pub ratings_url: String,
    pub title_kind: String,
    pub batch_size: usize,
    pub http_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            on_startup: true,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            titles_url: DEFAULT_TITLES_URL.to_string(),
            ratings_url: DEFAULT_RATINGS_URL.to_string(),
            title_kind: DEFAULT_TITLE_KIND.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl IngestConfig {
    /// Load ingestion configuration from `INGEST_*` environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            on_startup: env_or("INGEST_ON_STARTUP", defaults.on_startup)?,
            data_dir: env_or("INGEST_DATA_DIR", defaults.data_dir)?,
            titles_url: env_or("INGEST_TITLES_URL", defaults.titles_url)?,
            ratings_url: env_or("INGEST_RATINGS_URL", defaults.ratings_url)?,
            title_kind: env_or("INGEST_TITLE_KIND", defaults.title_kind)?,
            batch_size: env_or("INGEST_BATCH_SIZE", defaults.batch_size)?,
            http_timeout_secs: env_or("INGEST_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            anyhow::bail!("INGEST_BATCH_SIZE must be between 1 and {}", MAX_BATCH_SIZE);
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("INGEST_HTTP_TIMEOUT_SECS must be greater than 0");
        }
        if self.title_kind.trim().is_empty() {
            anyhow::bail!("INGEST_TITLE_KIND cannot be empty");
        }
        for (key, url) in [("INGEST_TITLES_URL", &self.titles_url), ("INGEST_RATINGS_URL", &self.ratings_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("{} must be an http(s) URL, got '{}'", key, url);
            }
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
