//! API route definitions.

use super::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/connectors", get(list_connectors))
        .route("/connectors/{id}", get(get_connector))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.snapshots.borrow();
    let status = if snapshot.consecutive_failures > 0 {
        "degraded"
    } else {
        "ok"
    };
    Json(json!({
        "data": {
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "consecutive_failures": snapshot.consecutive_failures,
            "last_tick": snapshot.last_tick,
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn list_connectors(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.snapshots.borrow();
    Json(json!({
        "data": snapshot.connectors,
        "meta": {
            "total": snapshot.connectors.len(),
            "consecutive_failures": snapshot.consecutive_failures,
            "first_tick_pending": snapshot.first_tick_pending,
            "last_tick": snapshot.last_tick,
        }
    }))
}

async fn get_connector(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let snapshot = state.snapshots.borrow();
    match snapshot.connectors.iter().find(|c| c.id == id) {
        Some(connector) => Ok(Json(json!({ "data": connector }))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown connector '{id}'") })),
        )),
    }
}
