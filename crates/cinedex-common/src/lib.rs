//! Cinedex Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the cinedex workspace members:
//!
//! - **Logging**: `tracing` subscriber setup driven by the environment
//! - **Error Handling**: shared error type and env parsing helper

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{env_or, CinedexError, Result};
