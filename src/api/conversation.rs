use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::memory::persist::TranscriptPersister;
use crate::vapi::extract;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveConversationRequest {
    pub phone_number: String,
    pub session_id: String,
    /// Raw transcript records; normalized through the same precedence
    /// chain as webhook payloads.
    pub transcript: Vec<serde_json::Value>,
    #[serde(default)]
    pub call_duration: Option<u64>,
    #[serde(default)]
    pub call_outcome: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveConversationResponse {
    pub success: bool,
    pub user_id: String,
    pub thread_id: String,
    pub messages_saved: usize,
    pub message: String,
}

/// POST /save-conversation
///
/// Persist a finished call's transcript. A store write failure is a
/// real error here (the transcript would otherwise be lost), so it
/// surfaces as an error response instead of being swallowed.
pub async fn save_conversation(
    State(state): State<AppState>,
    Json(req): Json<SaveConversationRequest>,
) -> Result<Json<SaveConversationResponse>> {
    if let Some(outcome) = &req.call_outcome {
        tracing::info!(
            user_id = %req.phone_number,
            call_outcome = %outcome,
            call_duration = req.call_duration,
            "saving conversation"
        );
    }

    let messages = extract::normalize(&req.transcript);

    let persister = TranscriptPersister::new(
        state.store.clone(),
        state.outbox.clone(),
        state.config.transcript.max_message_chars,
    );
    let saved = persister
        .save(&req.phone_number, &req.session_id, messages)
        .await?;

    let message = if saved == 0 {
        "No messages with content to save".to_string()
    } else {
        "Conversation saved to memory".to_string()
    };

    Ok(Json(SaveConversationResponse {
        success: true,
        user_id: req.phone_number,
        thread_id: req.session_id,
        messages_saved: saved,
        message,
    }))
}
