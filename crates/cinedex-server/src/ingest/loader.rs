//! Idempotent bulk loader
//!
//! Runs the whole ingestion once: lock, schema, gate, fetch, stream and write.
//! Loads are serialized through a Postgres advisory lock, and the gate is
//! evaluated only once the lock is held, so a loader that waited behind
//! another one sees its result and skips. The gate skips the load when both
//! tables already hold data. Otherwise both files are streamed into a single
//! transaction, so a failure anywhere leaves the tables exactly as they were
//! and the next run starts over cleanly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::config::IngestConfig;
use super::fetcher::{FetchError, SourceFetcher};
use super::models::{RawRecord, RATINGS_TABLE, TITLES_TABLE};
use super::normalizer::{normalize_rating, normalize_title};
use super::reader::{ReadError, TsvBatches};
use super::storage::{self, BatchInsert, LoadLock};

/// Local name of the title basics file (`movies.tsv[.gz]`).
pub const TITLES_FILE: &str = "movies";

/// Local name of the ratings file (`ratings.tsv[.gz]`).
pub const RATINGS_FILE: &str = "ratings";

/// Emit a progress line every this many batches.
const PROGRESS_EVERY: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Read failed: {0}")]
    Read(#[from] ReadError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Rows read and written for one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    /// Rows that survived normalization
    pub read: u64,
    /// Rows that were not already present
    pub inserted: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub titles: TableStats,
    pub ratings: TableStats,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl LoadReport {
    pub fn duration_secs(&self) -> f64 {
        (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// Both tables already held data; nothing was fetched or written
    Skipped,
    Loaded(LoadReport),
}

/// One-shot bulk loader
///
/// `run` consumes the loader, so a given instance cannot load twice.
pub struct BulkLoader {
    config: IngestConfig,
    fetcher: SourceFetcher,
    force: bool,
}

impl BulkLoader {
    pub fn new(config: IngestConfig) -> Result<Self, LoadError> {
        let fetcher = SourceFetcher::from_config(&config)?;
        Ok(Self {
            config,
            fetcher,
            force: false,
        })
    }

    /// Load even when both tables already hold data
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Run the load while holding the bulk load lock
    ///
    /// Waits for any concurrent loader (in this or another process) to finish
    /// first. The lock is released whether the load succeeds or fails.
    pub async fn run(self, pool: &PgPool) -> Result<LoadOutcome, LoadError> {
        let lock = LoadLock::acquire(pool).await?;
        debug!("Acquired bulk load lock");

        let outcome = self.load(pool).await;

        if let Err(e) = lock.release().await {
            warn!("Failed to release bulk load lock: {}", e);
        }
        outcome
    }

    async fn load(self, pool: &PgPool) -> Result<LoadOutcome, LoadError> {
        storage::ensure_schema(pool).await?;

        let has_titles = storage::has_rows(pool, TITLES_TABLE).await?;
        let has_ratings = storage::has_rows(pool, RATINGS_TABLE).await?;

        if has_titles && has_ratings && !self.force {
            info!("Tables {} and {} already populated, skipping load", TITLES_TABLE, RATINGS_TABLE);
            return Ok(LoadOutcome::Skipped);
        }

        info!(
            has_titles,
            has_ratings,
            force = self.force,
            "Starting bulk load into {} and {}",
            TITLES_TABLE,
            RATINGS_TABLE
        );
        let started_at = Utc::now();

        let titles_path = self
            .fetcher
            .fetch(TITLES_FILE, &self.config.titles_url)
            .await?;
        let ratings_path = self
            .fetcher
            .fetch(RATINGS_FILE, &self.config.ratings_url)
            .await?;

        let mut tx = pool.begin().await?;

        let kind = self.config.title_kind.clone();
        let titles = copy_file(
            &mut tx,
            titles_path,
            self.config.batch_size,
            move |r| normalize_title(r, &kind),
        )
        .await?;

        let ratings =
            copy_file(&mut tx, ratings_path, self.config.batch_size, normalize_rating).await?;

        tx.commit().await?;

        let report = LoadReport {
            titles,
            ratings,
            started_at,
            completed_at: Utc::now(),
        };

        info!(
            titles_read = report.titles.read,
            titles_inserted = report.titles.inserted,
            ratings_read = report.ratings.read,
            ratings_inserted = report.ratings.inserted,
            "Bulk load committed in {:.1}s",
            report.duration_secs()
        );

        Ok(LoadOutcome::Loaded(report))
    }
}

async fn copy_file<T, F>(
    tx: &mut Transaction<'_, Postgres>,
    path: PathBuf,
    batch_size: usize,
    normalize: F,
) -> Result<TableStats, LoadError>
where
    T: BatchInsert,
    F: Fn(&RawRecord) -> Option<T> + Send + 'static,
{
    info!("Loading {} into {}", path.display(), T::TABLE);

    let mut batches = TsvBatches::open(path, batch_size, normalize);
    let mut stats = TableStats::default();
    let mut count = 0usize;

    while let Some(batch) = batches.next_batch().await {
        let batch = batch?;
        stats.read += batch.len() as u64;
        stats.inserted += T::insert_batch(tx, &batch).await?;
        count += 1;

        if count % PROGRESS_EVERY == 0 {
            info!("{}: {} rows read, {} inserted", T::TABLE, stats.read, stats.inserted);
        } else {
            debug!("{}: batch {} ({} rows)", T::TABLE, count, batch.len());
        }
    }
    batches.finish().await?;

    info!("{}: done, {} rows read, {} inserted", T::TABLE, stats.read, stats.inserted);
    Ok(stats)
}
