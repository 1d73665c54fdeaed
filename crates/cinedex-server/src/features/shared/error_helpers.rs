//! Database error handling utilities
//!
//! Provides helpers for recognising unique constraint violations so commands
//! can report them as conflicts instead of generic database failures.
//!
//! # Examples
//!
//! ```rust,ignore
//! use cinedex_server::features::shared::error_helpers::map_unique_violation;
//!
//! sqlx::query("INSERT INTO movies (tconst) VALUES ($1)")
//!     .bind(&tconst)
//!     .execute(&pool)
//!     .await
//!     .map_err(|e| map_unique_violation(e, CreateTitleError::DuplicateId(tconst.clone()), CreateTitleError::Database))?;
//! ```

use sqlx::Error as SqlxError;

/// Check if the error is a unique constraint violation
pub fn is_unique_violation(error: &SqlxError) -> bool {
    if let SqlxError::Database(db_err) = error {
        return db_err.is_unique_violation();
    }
    false
}

/// Handle unique constraint violation with a custom error mapper
///
/// If the error is a unique constraint violation, returns `unique_error`.
/// Otherwise, returns the original error wrapped in the default wrapper.
pub fn map_unique_violation<E, F>(error: SqlxError, unique_error: E, default_wrapper: F) -> E
where
    F: FnOnce(SqlxError) -> E,
{
    if is_unique_violation(&error) {
        unique_error
    } else {
        default_wrapper(error)
    }
}
