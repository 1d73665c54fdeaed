use serde::Deserialize;
use sqlx::PgPool;

use crate::features::shared::validation::{require_tconst, TconstValidationError};
use crate::features::titles::models::{MovieRecord, MovieResponse, MOVIE_COLUMNS, MOVIE_FROM};

#[derive(Debug, Clone, Deserialize)]
pub struct GetTitleQuery {
    pub tconst: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetTitleError {
    #[error("{0}")]
    InvalidId(#[from] TconstValidationError),

    #[error("Title '{0}' not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GetTitleQuery {
    pub fn new(tconst: impl Into<String>) -> Self {
        Self {
            tconst: tconst.into(),
        }
    }
}

/// Fetch one title joined with its rating
///
/// A title without a rating row (or a rating without a title) is reported as
/// not found, matching what the list query can see. Ids are not checked
/// against the create rules: anything non-blank is looked up.
#[tracing::instrument(skip(pool), fields(tconst = %query.tconst))]
pub async fn handle(pool: PgPool, query: GetTitleQuery) -> Result<MovieResponse, GetTitleError> {
    let tconst = require_tconst(&query.tconst)?;

    let sql = format!("SELECT {} {} WHERE m.tconst = $1", MOVIE_COLUMNS, MOVIE_FROM);
    let record = sqlx::query_as::<_, MovieRecord>(&sql)
        .bind(tconst)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| GetTitleError::NotFound(tconst.to_string()))?;

    Ok(record.into())
}
