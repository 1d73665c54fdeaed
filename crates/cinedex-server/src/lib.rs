//! Cinedex Server Library
//!
//! Loads the public IMDb title and rating datasets into PostgreSQL once, then
//! serves them through a small catalog API.
//!
//! # Overview
//!
//! - **Ingestion** (`ingest`): fetch the gzipped TSV dumps, normalize each
//!   record and bulk insert both tables inside a single transaction. A second
//!   run finds the tables populated and does nothing.
//! - **Database** (`db`): connection pool, readiness probe and health check.
//! - **API** (`api`, `features`): create, fetch and list titles. List
//!   requests are compiled into parameterized SQL from a closed set of
//!   filters and sort fields.
//! - **Configuration** (`config`): environment-based, with defaults.
//! - **Middleware** (`middleware`): CORS and request tracing.
//!
//! # Architecture
//!
//! Features follow a command/query split:
//!
//! - **Commands** (write operations) validate input and run in a transaction
//! - **Queries** (read operations) never modify state
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing and JSON marshalling
//! - **SQLx**: PostgreSQL access with runtime-checked queries
//! - **Tower**: Middleware and service abstractions
//!
//! # Example
//!
//! ```no_run
//! use cinedex_server::{api, config::Config, db, ingest::BulkLoader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     BulkLoader::new(config.ingest.clone())?.run(&pool).await?;
//!     api::serve(config, pool).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod features;
pub mod ingest;
pub mod middleware;

// Re-export commonly used types
pub use api::response::AppError;
