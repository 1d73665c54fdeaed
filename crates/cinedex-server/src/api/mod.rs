pub mod response;

use crate::config::Config;
use crate::db;
use crate::features;
use crate::middleware;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use futures::FutureExt;
use sqlx::PgPool;
use std::future::{Future, IntoFuture};
use std::{net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::{info, warn};

/// Serve the catalog API until Ctrl+C or SIGTERM
pub async fn serve(config: Config, pool: PgPool) -> anyhow::Result<()> {
    let app = create_router(pool, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    let drain = Duration::from_secs(config.server.shutdown_timeout_secs);
    serve_until(listener, app, shutdown_signal(), drain).await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Serve `app` until `signal` resolves, then drain in-flight requests
///
/// The listener stops accepting as soon as the signal fires. Connections
/// still open after `drain` are dropped.
pub async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    drain: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let signal = signal.shared();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal.clone())
        .into_future();

    let deadline = async move {
        signal.await;
        info!("Waiting up to {} seconds for connections to close", drain.as_secs());
        tokio::time::sleep(drain).await;
    };

    tokio::select! {
        result = server => result,
        _ = deadline => {
            warn!("Connections still open after {} seconds, closing them", drain.as_secs());
            Ok(())
        },
    }
}

/// Create the application router with all routes and middleware
pub fn create_router(pool: PgPool, config: &Config) -> Router {
    let feature_routes = features::router(features::FeatureState { db: pool.clone() });

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .with_state(pool)
        .nest("/api/v1", feature_routes)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Cinedex",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Health check handler
async fn health_check(State(pool): State<PgPool>) -> Response {
    match db::health_check(&pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "unreachable"
                })),
            )
                .into_response()
        },
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
