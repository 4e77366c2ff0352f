mod api;
mod health;
mod ws;

pub use api::api_router;
pub use health::health_router;
pub use ws::ws_router;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use engine::DashboardSnapshot;

use crate::AppState;

/// The newest snapshot, or a 503 until the engine has published one.
fn latest(state: &AppState) -> Result<Arc<DashboardSnapshot>, Response> {
    state.engine.latest().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "snapshot not ready"})),
        )
            .into_response()
    })
}
