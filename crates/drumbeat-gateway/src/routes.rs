//! API route handlers for the gateway.

use axum::http::StatusCode;
use axum::{Json, extract::State};
use std::sync::Arc;

use drumbeat_core::error::DrumbeatError;
use drumbeat_engine::SubmitRequest;

use super::server::AppState;

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "drumbeat-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// System information endpoint.
pub async fn system_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = state.start_time.elapsed();
    Json(serde_json::json!({
        "service": "drumbeat",
        "version": env!("CARGO_PKG_VERSION"),
        "platform": format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        "uptime_secs": uptime.as_secs(),
        "active_tasks": state.engine.active_accounts().len(),
    }))
}

/// Submit a new send task. Validation and the first login happen before the
/// loop starts, so those failures surface in the response.
pub async fn submit_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.engine.submit(request).await {
        Ok(account_id) => (
            StatusCode::OK,
            Json(serde_json::json!({"ok": true, "account_id": account_id})),
        ),
        Err(e) => {
            let status = match &e {
                DrumbeatError::Validation(_) => StatusCode::BAD_REQUEST,
                DrumbeatError::Auth(_) => StatusCode::UNAUTHORIZED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(serde_json::json!({"ok": false, "error": e.to_string()})),
            )
        }
    }
}

/// List accounts with a live loop.
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let active = state.engine.active_accounts();
    Json(serde_json::json!({
        "ok": true,
        "count": active.len(),
        "active": active,
    }))
}

/// Report whether one account's loop is live.
pub async fn task_status(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(account_id): axum::extract::Path<String>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "account_id": account_id,
        "active": state.engine.is_active(&account_id),
    }))
}

/// Stop an account's loop and drop its ledger record.
pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(account_id): axum::extract::Path<String>,
) -> Json<serde_json::Value> {
    let stopped = state.engine.cancel(&account_id).await;
    Json(serde_json::json!({"ok": true, "stopped": stopped}))
}
