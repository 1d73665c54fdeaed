//! Create title command
//!
//! Adds one title and its rating in a single transaction. Titles are never
//! updated: posting an id that already exists is a conflict and leaves the
//! stored rows exactly as they were.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::error_helpers::map_unique_violation;
use crate::features::shared::validation::{
    validate_tconst, TconstValidationError, MAX_TCONST_LENGTH,
};
use crate::features::titles::models::MovieResponse;

pub const MIN_YEAR: i32 = 1800;
pub const MAX_YEAR: i32 = 2100;
pub const MAX_RATING: f64 = 10.0;

/// Command to create a new title
///
/// # Examples
///
/// ```rust,ignore
/// use cinedex_server::features::titles::commands::CreateTitleCommand;
///
/// let command = CreateTitleCommand {
///     tconst: "tt0111161".to_string(),
///     title: "The Shawshank Redemption".to_string(),
///     genre: "Drama".to_string(),
///     year: 1994,
///     rating: 9.3,
///     votes: 2_900_000,
///     runtime: 142,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTitleCommand {
    /// External IMDb id, e.g. `tt0111161` (surrounding whitespace is ignored)
    pub tconst: String,
    pub title: String,
    pub genre: String,
    pub year: i32,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub votes: i32,
    /// Minutes
    pub runtime: i32,
}

/// Errors that can occur when creating a title
#[derive(Debug, thiserror::Error)]
pub enum CreateTitleError {
    #[error("{0}")]
    InvalidId(#[from] TconstValidationError),

    #[error("Year must be between 1800 and 2100, got {0}")]
    YearOutOfRange(i32),

    #[error("Rating must be between 0 and 10, got {0}")]
    RatingOutOfRange(f64),

    #[error("Votes cannot be negative, got {0}")]
    NegativeVotes(i32),

    #[error("Runtime must be at least 1 minute, got {0}")]
    RuntimeTooShort(i32),

    #[error("Title with id '{0}' already exists")]
    DuplicateId(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CreateTitleCommand {
    /// Validates the command parameters
    ///
    /// # Errors
    ///
    /// - Id must be non-empty after trimming, without inner whitespace
    /// - Year must be within 1800..=2100
    /// - Rating must be a number within 0..=10
    /// - Votes cannot be negative
    /// - Runtime must be at least one minute
    #[tracing::instrument(skip(self), fields(tconst = %self.tconst))]
    pub fn validate(&self) -> Result<(), CreateTitleError> {
        validate_tconst(&self.tconst, MAX_TCONST_LENGTH)?;

        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) {
            return Err(CreateTitleError::YearOutOfRange(self.year));
        }

        if !(0.0..=MAX_RATING).contains(&self.rating) {
            return Err(CreateTitleError::RatingOutOfRange(self.rating));
        }

        if self.votes < 0 {
            return Err(CreateTitleError::NegativeVotes(self.votes));
        }

        if self.runtime < 1 {
            return Err(CreateTitleError::RuntimeTooShort(self.runtime));
        }

        tracing::debug!("Command validation passed");
        Ok(())
    }
}

/// Handler function for creating titles
///
/// # Errors
///
/// - Validation errors if command parameters are invalid
/// - `DuplicateId` if a title with the same id exists
/// - Database errors if the operation fails
#[tracing::instrument(
    skip(pool, command),
    fields(tconst = %command.tconst, year = command.year)
)]
pub async fn handle(
    pool: PgPool,
    command: CreateTitleCommand,
) -> Result<MovieResponse, CreateTitleError> {
    command.validate()?;
    let tconst = command.tconst.trim().to_string();

    tracing::info!("Creating title");

    let duplicate = |e| {
        map_unique_violation(e, CreateTitleError::DuplicateId(tconst.clone()), CreateTitleError::Database)
    };

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO movies (tconst, title_type, primary_title, original_title, is_adult,
                            start_year, end_year, runtime_minutes, genres)
        VALUES ($1, 'movie', $2, $2, FALSE, $3, 0, $4, $5)
        ON CONFLICT (tconst) DO NOTHING
        "#,
    )
    .bind(&tconst)
    .bind(&command.title)
    .bind(command.year)
    .bind(command.runtime)
    .bind(&command.genre)
    .execute(&mut *tx)
    .await
    .map_err(duplicate)?
    .rows_affected();

    if inserted == 0 {
        // Dropping `tx` rolls back; the existing title is left untouched.
        tracing::info!("Title already exists");
        return Err(CreateTitleError::DuplicateId(tconst));
    }

    let rated = sqlx::query(
        r#"
        INSERT INTO rating_movies (tconst, average_rating, num_votes)
        VALUES ($1, $2, $3)
        ON CONFLICT (tconst) DO NOTHING
        "#,
    )
    .bind(&tconst)
    .bind(command.rating)
    .bind(command.votes)
    .execute(&mut *tx)
    .await
    .map_err(duplicate)?
    .rows_affected();

    if rated == 0 {
        tracing::warn!("Rating row already present for new title; keeping it");
    }

    tx.commit().await?;

    tracing::info!("Title created successfully");

    Ok(MovieResponse {
        tconst,
        title: command.title,
        genre: command.genre,
        year: command.year,
        rating: command.rating,
        runtime: command.runtime,
    })
}
