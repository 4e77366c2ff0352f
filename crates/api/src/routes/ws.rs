use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use engine::SnapshotCell;

use crate::{auth, AppState};

pub fn ws_router() -> Router<AppState> {
    Router::new().route("/ws/snapshots", get(ws_snapshots_handler))
}

#[derive(Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// Streams every published snapshot as a JSON text frame. Auth via
/// `?token=<DASHBOARD_TOKEN>` since browsers cannot set WS headers.
async fn ws_snapshots_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(q): Query<WsQuery>,
) -> Response {
    if !auth::is_authorized(&state, q.token.as_deref()) {
        return auth::unauthorized();
    }

    let rx = state.engine.subscribe();
    ws.on_upgrade(move |socket| handle_ws(socket, rx))
}

async fn handle_ws(mut socket: WebSocket, mut rx: watch::Receiver<SnapshotCell>) {
    // the current snapshot first, then each new one
    let mut pending = rx.borrow_and_update().clone();
    loop {
        if let Some(snapshot) = pending.take() {
            let text = match serde_json::to_string(&*snapshot) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to serialise snapshot for WebSocket");
                    continue;
                }
            };
            if socket.send(Message::Text(text)).await.is_err() {
                debug!("WebSocket client disconnected");
                return;
            }
        }

        if rx.changed().await.is_err() {
            debug!("Engine stopped, closing WebSocket");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
        pending = rx.borrow_and_update().clone();
    }
}
