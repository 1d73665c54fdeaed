//! Feature modules implementing the Cinedex API
//!
//! Each feature is organized as a vertical slice with its own commands,
//! queries, and routes.
//!
//! # Features
//!
//! - **titles**: Create, fetch and list IMDb titles with their ratings
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations (create)
//! - `queries/` - Read operations (get, list)
//! - `routes.rs` - HTTP route definitions
//! - `models.rs` - Shared read model

pub mod shared;
pub mod titles;

use axum::Router;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for database operations
    pub db: sqlx::PgPool,
}

/// Creates the main API router with all feature routes mounted
///
/// - `/movies` - Title catalog
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest("/movies", titles::titles_routes().with_state(state.db))
}
