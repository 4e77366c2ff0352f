use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use engine::{DashboardSnapshot, EngineCommand};
use risk::LeverageCalculator;

use super::latest;
use crate::{auth::require_auth, AppState};

pub fn api_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/refresh", post(post_refresh))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/signal", get(get_signal))
        .route("/api/confluence", get(get_confluence))
        .route("/api/levels", get(get_levels))
        .route("/api/risk", get(get_risk))
        .route("/api/news", get(get_news))
        .merge(protected)
}

// ─── Snapshot views ───────────────────────────────────────────────────────────

async fn get_snapshot(
    State(state): State<AppState>,
) -> Result<Json<DashboardSnapshot>, Response> {
    let snap = latest(&state)?;
    Ok(Json(DashboardSnapshot::clone(&snap)))
}

async fn get_signal(State(state): State<AppState>) -> Result<Json<Value>, Response> {
    let snap = latest(&state)?;
    Ok(Json(json!({
        "symbol": snap.symbol,
        "generated_at": snap.generated_at,
        "price": snap.price,
        "signal": snap.signal,
        "trend": snap.trend,
        "reference": snap.reference,
    })))
}

async fn get_confluence(State(state): State<AppState>) -> Result<Json<Value>, Response> {
    let snap = latest(&state)?;
    Ok(Json(json!({
        "symbol": snap.symbol,
        "generated_at": snap.generated_at,
        "confluence": snap.confluence,
    })))
}

async fn get_levels(State(state): State<AppState>) -> Result<Json<Value>, Response> {
    let snap = latest(&state)?;
    Ok(Json(json!({
        "symbol": snap.symbol,
        "price": snap.price,
        "fibonacci": snap.fibonacci,
        "key_levels": snap.key_levels,
        "historical": snap.historical,
    })))
}

async fn get_news(State(state): State<AppState>) -> Result<Json<Value>, Response> {
    let snap = latest(&state)?;
    Ok(Json(json!({
        "symbol": snap.symbol,
        "generated_at": snap.generated_at,
        "news": snap.news,
    })))
}

// ─── Risk calculator ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RiskQuery {
    capital: Option<f64>,
    risk_pct: Option<f64>,
    tp_pct: Option<f64>,
}

async fn get_risk(
    State(state): State<AppState>,
    Query(q): Query<RiskQuery>,
) -> Result<Json<Value>, Response> {
    let snap = latest(&state)?;
    let Some(price) = snap.price else {
        return Err(error(StatusCode::SERVICE_UNAVAILABLE, "price not available"));
    };

    let report = LeverageCalculator::new(
        q.capital.unwrap_or(1_000.0),
        q.risk_pct.unwrap_or(50.0),
        q.tp_pct.unwrap_or(5.0),
    )
    .and_then(|calc| calc.report(price))
    .map_err(|e| error(StatusCode::BAD_REQUEST, &e.to_string()))?;

    Ok(Json(json!({ "symbol": snap.symbol, "risk": report })))
}

// ─── Refresh ──────────────────────────────────────────────────────────────────

async fn post_refresh(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    info!("POST /api/refresh received");
    state.engine.send(EngineCommand::Refresh).await;
    (StatusCode::ACCEPTED, Json(json!({ "status": "refresh scheduled" })))
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::router;
    use crate::test_support::{idle_state, ready_state};

    async fn call(state: AppState, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn views_are_unavailable_before_first_snapshot() {
        let (state, _engine) = idle_state(None);
        let uris = [
            "/api/snapshot",
            "/api/signal",
            "/api/confluence",
            "/api/levels",
            "/api/risk",
            "/api/news",
        ];
        for uri in uris {
            let (status, body) = call(state.clone(), get(uri)).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
            assert_eq!(body["error"], "snapshot not ready");
        }
    }

    #[tokio::test]
    async fn snapshot_views_serve_latest() {
        let state = ready_state(None).await;

        let (status, body) = call(state.clone(), get("/api/snapshot")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "BTCUSDT");
        assert!(body["price"].is_number());

        let (_, body) = call(state.clone(), get("/api/signal")).await;
        assert!(body["signal"]["label"].is_string());
        assert_eq!(body["reference"]["correlation"]["trend"], "N/A");

        let (_, body) = call(state.clone(), get("/api/confluence")).await;
        assert_eq!(body["confluence"]["statuses"]["1h"], "BULLISH");

        let (_, body) = call(state, get("/api/levels")).await;
        assert!(body["fibonacci"]["61.8%"].is_number());
    }

    #[tokio::test]
    async fn news_serves_scored_headlines() {
        let state = ready_state(None).await;

        let (status, body) = call(state, get("/api/news")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "BTCUSDT");
        assert_eq!(body["news"]["label"], "Positive");
        assert_eq!(body["news"]["score"], 0.6);
        assert_eq!(body["news"]["items"][0]["title"], "Bitcoin ETF inflows hit a record");
    }

    #[tokio::test]
    async fn risk_uses_latest_price() {
        let state = ready_state(None).await;

        let uri = "/api/risk?capital=1000&risk_pct=10&tp_pct=2";
        let (status, body) = call(state.clone(), get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["risk"]["scenarios"].as_array().unwrap().len(), 3);
        assert_eq!(body["risk"]["max_risk_usd"], 500.0);

        let (status, body) = call(state, get("/api/risk?risk_pct=150")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("risk percentage"));
    }

    #[tokio::test]
    async fn refresh_requires_token_when_configured() {
        let (state, _engine) = idle_state(Some("s3cret"));

        let req = Request::builder()
            .method("POST")
            .uri("/api/refresh")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(state.clone(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .method("POST")
            .uri("/api/refresh")
            .header("Authorization", "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(state, req).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "refresh scheduled");
    }

    #[tokio::test]
    async fn refresh_is_open_without_token() {
        let (state, _engine) = idle_state(None);
        let req = Request::builder()
            .method("POST")
            .uri("/api/refresh")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(state, req).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn healthz_reports_readiness() {
        let (state, _engine) = idle_state(Some("s3cret"));
        let (status, body) = call(state, get("/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["snapshot_ready"], false);
    }
}
