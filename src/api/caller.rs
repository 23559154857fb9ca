use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::memory::context::ContextRetriever;
use crate::memory::reconcile::Reconciler;
use crate::memory::types::{CallerContext, RanchData};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CallerContextRequest {
    pub phone_number: String,
    /// Captured name, when the platform managed to get one.
    #[serde(default)]
    pub caller_name: Option<String>,
}

/// POST /get-caller-context
///
/// Direct context lookup for a caller. Same tiered retrieval as the
/// webhook path; always answers 200 with a usable context string.
pub async fn get_caller_context(
    State(state): State<AppState>,
    Json(req): Json<CallerContextRequest>,
) -> Json<CallerContext> {
    if let Some(name) = &req.caller_name {
        tracing::debug!(caller_name = %name, "caller name captured but not yet stored");
    }

    let retriever = ContextRetriever::new(state.store.clone());
    Json(retriever.fetch(&req.phone_number, None).await)
}

#[derive(Debug, Deserialize)]
pub struct AddRanchDataRequest {
    pub phone_number: String,
    #[serde(flatten)]
    pub data: RanchData,
}

/// POST /add-ranch-data
///
/// Merge structured operation data into the caller's graph. Unlike
/// retrieval, a store failure here surfaces as an error response.
pub async fn add_ranch_data(
    State(state): State<AppState>,
    Json(req): Json<AddRanchDataRequest>,
) -> Result<Json<serde_json::Value>> {
    if req.data.is_empty() {
        return Ok(Json(json!({
            "success": true,
            "user_id": req.phone_number,
            "data_added": {},
            "message": "No fields provided",
        })));
    }

    let reconciler = Reconciler::new(state.store.clone());
    reconciler.ensure_user(&req.phone_number).await?;

    let data = serde_json::to_value(&req.data)?;
    state.store.graph_add(&req.phone_number, data.clone()).await?;

    tracing::info!(user_id = %req.phone_number, "ranch data saved");

    Ok(Json(json!({
        "success": true,
        "user_id": req.phone_number,
        "data_added": data,
        "message": "Ranch data saved",
    })))
}

/// GET /get-user-facts/:phone_number
///
/// Debug surface: what the store knows about a caller. Failures come
/// back as `success: false` rather than an error status.
pub async fn get_user_facts(
    State(state): State<AppState>,
    Path(phone_number): Path<String>,
) -> Json<serde_json::Value> {
    match state.store.graph_search(&phone_number, "", 10).await {
        Ok(facts) => Json(json!({
            "success": true,
            "user_id": phone_number,
            "total_facts": facts.len(),
            "facts": facts,
        })),
        Err(e) => Json(json!({
            "success": false,
            "error": e.to_string(),
            "message": "Could not retrieve facts",
        })),
    }
}
