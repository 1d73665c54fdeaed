//! Error types shared by cinedex crates

use thiserror::Error;

/// Result type alias for shared cinedex operations
pub type Result<T> = std::result::Result<T, CinedexError>;

/// Errors raised outside a specific component
#[derive(Error, Debug)]
pub enum CinedexError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CinedexError {
    /// Configuration error naming the offending environment variable
    pub fn invalid_env(key: &str, value: &str, expected: &str) -> Self {
        Self::Config(format!("{}='{}' is invalid: expected {}", key, value, expected))
    }
}

/// Read `key` from the environment and parse it, falling back to `default`
/// when the variable is unset
///
/// A set-but-unparseable value is an error rather than a silent fallback.
pub fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            CinedexError::invalid_env(key, &raw, std::any::type_name::<T>())
        }),
        Err(_) => Ok(default),
    }
}
