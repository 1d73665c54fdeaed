//! Shared validation utilities
//!
//! Provides common validation functions for input data across commands and queries.
//!
//! # Examples
//!
//! ```rust,ignore
//! use cinedex_server::features::shared::validation::validate_tconst;
//!
//! let tconst = validate_tconst("  tt0111161 ", 32)?;
//! assert_eq!(tconst, "tt0111161");
//! ```

use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Longest title identifier accepted from clients.
pub const MAX_TCONST_LENGTH: usize = 32;

/// Errors that can occur during identifier validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TconstValidationError {
    #[error("Title id is required and cannot be empty")]
    Required,

    #[error("Title id must be at most {max_length} characters")]
    TooLong { max_length: usize },

    #[error("Title id cannot contain whitespace or control characters")]
    InvalidFormat,
}

/// Validate a title identifier (e.g. `tt0111161`)
///
/// # Rules
/// - Surrounding whitespace is ignored
/// - Must not be empty once trimmed
/// - Must not exceed max_length characters
/// - Must not contain inner whitespace or control characters
///
/// # Returns
/// The trimmed identifier
pub fn validate_tconst(tconst: &str, max_length: usize) -> Result<&str, TconstValidationError> {
    let tconst = tconst.trim();

    if tconst.is_empty() {
        return Err(TconstValidationError::Required);
    }

    if tconst.chars().count() > max_length {
        return Err(TconstValidationError::TooLong { max_length });
    }

    if tconst.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(TconstValidationError::InvalidFormat);
    }

    Ok(tconst)
}

/// Trimmed title identifier for lookups
///
/// Only a blank id is rejected. Anything else is a plain key that either
/// matches a stored title or does not.
pub fn require_tconst(tconst: &str) -> Result<&str, TconstValidationError> {
    let tconst = tconst.trim();
    if tconst.is_empty() {
        return Err(TconstValidationError::Required);
    }
    Ok(tconst)
}

/// Deserialize an optional query parameter, treating `?key=` like an absent key
///
/// Use with `#[serde(default, deserialize_with = "empty_string_as_none")]`.
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}
