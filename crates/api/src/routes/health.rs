use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Liveness check, no auth. Reports whether a snapshot exists yet.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.engine.latest();
    Json(json!({
        "status": "ok",
        "snapshot_ready": snapshot.is_some(),
        "generated_at": snapshot.as_ref().map(|s| s.generated_at),
        "symbol": snapshot.as_ref().map(|s| s.symbol.as_str()),
    }))
}
