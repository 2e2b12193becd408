use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::api::AppState;

/// Liveness probe with delivery counters
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let (sent, failed) = state.push.counts();
    Json(json!({
        "status": "ok",
        "live_streams": state.stream.open_connections().await,
        "push": { "sent": sent, "failed": failed },
    }))
}
