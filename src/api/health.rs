use axum::extract::State;
use axum::Json;

use super::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the shared ledger lock can be taken; reports its size.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let ledger = state.ledger.read().await;
    Json(serde_json::json!({
        "status": "ready",
        "transactions": ledger.transaction_count(),
        "items": ledger.item_count(),
    }))
}
