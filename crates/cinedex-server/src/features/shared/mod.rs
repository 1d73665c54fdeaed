//! Shared utilities and types for feature modules
//!
//! # Contents
//!
//! - **validation**: Input validation utilities
//! - **error_helpers**: Database error handling utilities
//! - **test_helpers**: Test fixtures and utilities (test-only)

pub mod error_helpers;
pub mod validation;

#[cfg(test)]
pub mod test_helpers;

// Re-export commonly used types
pub use validation::{empty_string_as_none, require_tconst, validate_tconst, TconstValidationError};
