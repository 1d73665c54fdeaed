//! Startup readiness probe
//!
//! The database container is usually still starting when the service boots.
//! Before anything else touches the database we open (and immediately close)
//! a single connection, retrying a bounded number of times with a fixed
//! delay between attempts.

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("Database not reachable after {attempts} attempt(s)")]
    Exhausted {
        attempts: u32,
        #[source]
        last_error: Option<sqlx::Error>,
    },
}

/// Block until the database accepts a connection or `max_attempts` probes fail
pub async fn wait_for_ready(
    options: &PgConnectOptions,
    max_attempts: u32,
    delay: Duration,
) -> Result<(), WaitError> {
    let probe = move || async move {
        let conn = PgConnection::connect_with(options).await?;
        conn.close().await
    };

    match retry(probe, max_attempts, delay).await {
        Ok(attempt) => {
            info!(attempt, "Database is ready");
            Ok(())
        },
        Err(last_error) => Err(WaitError::Exhausted {
            attempts: max_attempts,
            last_error,
        }),
    }
}

/// Run `probe` until it succeeds, returning the 1-based attempt that did
///
/// Sleeps `delay` after every failure except the last. Yields the last error
/// once `max_attempts` probes have failed (`None` if none were allowed).
async fn retry<F, Fut, E>(mut probe: F, max_attempts: u32, delay: Duration) -> Result<u32, Option<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match probe().await {
            Ok(()) => return Ok(attempt),
            Err(e) => {
                warn!(attempt, max_attempts, "Database not ready yet: {}", e);
                last_error = Some(e);
                if attempt < max_attempts {
                    tokio::time::sleep(delay).await;
                }
            },
        }
    }

    Err(last_error)
}
