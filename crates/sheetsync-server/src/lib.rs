pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use sheetsync_core::SyncStatus;
use tower_http::trace::TraceLayer;

/// Build the axum Router with the health and status routes.
/// Used by `serve()` and available for integration testing.
pub fn build_router(status: Arc<SyncStatus>) -> Router {
    let app_state = state::AppState::new(status);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/status", get(routes::status::get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Serve health and status on `0.0.0.0:{port}` until the process exits.
pub async fn serve(status: Arc<SyncStatus>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(status, listener).await
}

/// Serve on a pre-bound listener, so callers binding port 0 can read the
/// actual port first.
pub async fn serve_on(
    status: Arc<SyncStatus>,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(status);

    tracing::info!("health server listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
