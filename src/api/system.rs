use axum::extract::State;
use axum::response::Json;
use serde_json::json;

use crate::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let pending = state.outbox.pending().await.unwrap_or(0);
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "zep_api_key_set": state.config.zep.api_key.is_some(),
        "outbox_pending": pending,
    }))
}

/// GET /info
pub async fn info() -> Json<serde_json::Value> {
    Json(json!({
        "service": "Ranchline Voice Agent Memory API",
        "status": "running",
        "endpoints": {
            "webhook": "POST /",
            "get_context": "POST /get-caller-context",
            "save_conversation": "POST /save-conversation",
            "add_ranch_data": "POST /add-ranch-data",
            "get_facts": "GET /get-user-facts/{phone_number}",
            "health": "GET /health",
            "info": "GET /info",
        }
    }))
}
