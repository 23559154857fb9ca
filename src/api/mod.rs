pub mod caller;
pub mod conversation;
pub mod system;
pub mod webhook;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

/// Build the full API router.
pub fn router() -> Router<AppState> {
    Router::new()
        // ── Vapi webhook dispatcher ────────────────────────────────
        .route("/", post(webhook::handle))
        // ── Direct caller-memory surface ───────────────────────────
        .route("/get-caller-context", post(caller::get_caller_context))
        .route("/save-conversation", post(conversation::save_conversation))
        .route("/add-ranch-data", post(caller::add_ranch_data))
        .route("/get-user-facts/:phone_number", get(caller::get_user_facts))
        // ── Health / info ──────────────────────────────────────────
        .route("/health", get(system::health))
        .route("/info", get(system::info))
}
