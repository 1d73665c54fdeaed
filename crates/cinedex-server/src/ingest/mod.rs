//! IMDb dataset ingestion
//!
//! # Pipeline
//!
//! - **fetcher**: download `title.basics` / `title.ratings` and gunzip them
//!   into the data directory, reusing whatever is already there
//! - **reader**: stream a TSV file in batches from the blocking pool
//! - **normalizer**: raw record -> typed, null-free row
//! - **storage**: schema creation and `ON CONFLICT DO NOTHING` batch inserts
//! - **loader**: the gated, single-transaction bulk load tying it together
//!
//! The load runs before the HTTP server starts (or from the
//! `cinedex-bootstrap` binary) and never concurrently with itself.

pub mod config;
pub mod fetcher;
pub mod loader;
pub mod models;
pub mod normalizer;
pub mod reader;
pub mod storage;

pub use config::IngestConfig;
pub use fetcher::{FetchError, SourceFetcher};
pub use loader::{BulkLoader, LoadError, LoadOutcome, LoadReport, TableStats};
pub use models::{RatingRow, RawRecord, TitleRow};
