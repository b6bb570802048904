//! Router setup with all API routes and middleware.

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use helpdesk_core::config::ApiConfig;
use helpdesk_core::error::HelpdeskError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(local_origins(&state.config.api)))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route("/tickets", get(handlers::list_tickets))
        .route("/tickets/{id}", get(handlers::get_ticket))
        .route("/tickets/{id}/response", post(handlers::respond_to_ticket))
        .layer(DefaultBodyLimit::max(256 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Browser origins allowed to call the API: the server itself and a local
/// frontend on port+1.
fn local_origins(config: &ApiConfig) -> Vec<HeaderValue> {
    let frontend = config.port.saturating_add(1);
    [config.port, frontend]
        .into_iter()
        .flat_map(|port| {
            [
                format!("http://127.0.0.1:{port}"),
                format!("http://localhost:{port}"),
            ]
        })
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect()
}

/// Serve on the configured address until `shutdown` resolves.
pub async fn start_server<F>(state: AppState, shutdown: F) -> Result<(), HelpdeskError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", state.config.api.host, state.config.api.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HelpdeskError::Config(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}
