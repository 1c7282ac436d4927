//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use drumbeat_core::config::DrumbeatConfig;
use drumbeat_engine::SessionEngine;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SessionEngine>,
    pub start_time: std::time::Instant,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);
    Router::new()
        .route("/health", get(super::routes::health_check))
        .route("/api/v1/info", get(super::routes::system_info))
        .route(
            "/api/v1/tasks",
            post(super::routes::submit_task).get(super::routes::list_tasks),
        )
        .route(
            "/api/v1/tasks/{account_id}",
            get(super::routes::task_status).delete(super::routes::cancel_task),
        )
        .layer({
            let cors = CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .max_age(std::time::Duration::from_secs(3600));

            // Restrict CORS origins in production via env var
            // Example: DRUMBEAT_CORS_ORIGINS=https://ops.example.com
            if let Ok(origins_str) = std::env::var("DRUMBEAT_CORS_ORIGINS") {
                let origins: Vec<_> = origins_str
                    .split(',')
                    .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
                    .collect();
                cors.allow_origin(origins)
            } else {
                cors.allow_origin(Any)
            }
        })
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server.
pub async fn start(config: &DrumbeatConfig, engine: Arc<SessionEngine>) -> anyhow::Result<()> {
    let state = AppState {
        engine,
        start_time: std::time::Instant::now(),
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
