//! chainstatus-api: HTTP surface over the cached indexing status.
//!
//! | Route               | Purpose                                         |
//! |---------------------|-------------------------------------------------|
//! | `GET /health`       | liveness                                        |
//! | `GET /config`       | public server config                            |
//! | `GET /indexing-status` | status projection (`?maxRealtimeDistance=N`) |
//! | `GET /realtime`     | realtime check (`?maxWorstCaseDistance=N`)      |

use std::future::Future;

use axum::{routing::get, Router};
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace};
use tracing::Level;

pub mod config;
pub mod error;
pub mod gate;
pub mod routes;
pub mod state;

pub use config::{PublicConfig, ServerSettings};
pub use error::{ApiError, ResultCode};
pub use gate::{evaluate, GateResult, Prerequisites, ProgressDetail};
pub use state::{register_indexing_status_cache, AppState, INDEXING_STATUS_CACHE};

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),
}

pub fn router(state: AppState, permissive_cors: bool) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/config", get(routes::config::config))
        .route("/indexing-status", get(routes::indexing_status::indexing_status))
        .route("/realtime", get(routes::realtime::realtime))
        .with_state(state)
        .layer(
            trace::TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(if permissive_cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(settings: ServerSettings, state: AppState, shutdown: F) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, settings.permissive_cors);

    let listener = tokio::net::TcpListener::bind(settings.listen_address)
        .await
        .map_err(|source| ServeError::Bind {
            address: settings.listen_address,
            source,
        })?;

    tracing::info!(address = %settings.listen_address, "serving indexing status api");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "http server failed");
            ServeError::Server(e)
        })?;

    tracing::info!("indexing status api stopped");
    Ok(())
}
