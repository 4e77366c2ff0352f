use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::AppState;

/// Whether `provided` unlocks protected routes. Always true when no token
/// is configured.
pub fn is_authorized(state: &AppState, provided: Option<&str>) -> bool {
    match state.dashboard_token.as_deref() {
        None => true,
        Some(expected) => provided == Some(expected),
    }
}

/// Middleware enforcing `Authorization: Bearer <token>` on protected routes.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if is_authorized(&state, token) {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Rejected unauthenticated request");
    unauthorized()
}

pub fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response()
}
