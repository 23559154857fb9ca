use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::memory::context::ContextRetriever;
use crate::memory::persist::TranscriptPersister;
use crate::memory::reconcile::thread_key;
use crate::trace::TraceEvent;
use crate::vapi::extract;
use crate::vapi::types::{WebhookEnvelope, WebhookMessage};
use crate::AppState;

/// Tool names routed to the caller-memory lookup.
const MEMORY_TOOL_NAMES: [&str; 2] = ["get_caller_context", "lookup_caller_memory"];

/// POST / — Vapi webhook dispatcher.
///
/// Every branch terminates with a JSON body; a malformed envelope is
/// acknowledged, never faulted on.
pub async fn handle(State(state): State<AppState>, Json(payload): Json<Value>) -> Json<Value> {
    Json(dispatch(&state, payload).await)
}

/// Route one webhook event by its declared type.
pub async fn dispatch(state: &AppState, payload: Value) -> Value {
    let msg = serde_json::from_value::<WebhookEnvelope>(payload)
        .unwrap_or_default()
        .message;

    tracing::info!(event_type = %msg.kind, "webhook received");

    match msg.kind.as_str() {
        "assistant-request" | "assistant.started" => assistant_request(state, &msg).await,
        "tool-calls" | "function-call" => tool_calls(state, &msg).await,
        "end-of-call-report" => end_of_call(state, &msg).await,
        other => {
            TraceEvent::WebhookUnhandled {
                event_type: other.to_string(),
            }
            .emit();
            json!({ "status": "acknowledged" })
        }
    }
}

// ── Call start: seed the assistant with caller context ─────────────

async fn assistant_request(state: &AppState, msg: &WebhookMessage) -> Value {
    let Some(phone) = extract::caller_phone(msg) else {
        return ignored(&msg.kind, "no caller phone number");
    };

    let retriever = ContextRetriever::new(state.store.clone());
    let ctx = retriever.fetch(phone, extract::call_id(msg)).await;

    json!({
        "assistant": {
            "firstMessage": ctx.context,
        }
    })
}

// ── Mid-call tool invocation ───────────────────────────────────────

async fn tool_calls(state: &AppState, msg: &WebhookMessage) -> Value {
    let Some(call) = extract::first_tool_call(msg) else {
        return ignored(&msg.kind, "no tool calls in payload");
    };

    let name = call
        .function
        .as_ref()
        .map(|f| f.name.as_str())
        .unwrap_or_default();
    let tool_call_id = call.id.clone().unwrap_or_default();

    if !MEMORY_TOOL_NAMES.contains(&name) {
        tracing::warn!(tool = name, "unsupported tool requested");
        return tool_result(&tool_call_id, json!("not implemented"));
    }

    // Phone from the tool arguments, falling back to the call envelope.
    let args = extract::tool_arguments(call);
    let phone = args
        .get("phone_number")
        .and_then(Value::as_str)
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string)
        .or_else(|| extract::caller_phone(msg).map(str::to_string));

    let Some(phone) = phone else {
        return ignored(&msg.kind, "no caller phone number");
    };

    let retriever = ContextRetriever::new(state.store.clone());
    let ctx = retriever.fetch(&phone, extract::call_id(msg)).await;

    tool_result(&tool_call_id, serde_json::to_value(&ctx).unwrap_or(Value::Null))
}

fn tool_result(tool_call_id: &str, result: Value) -> Value {
    json!({
        "results": [{
            "toolCallId": tool_call_id,
            "result": result,
        }]
    })
}

// ── Call end: persist the transcript ───────────────────────────────

async fn end_of_call(state: &AppState, msg: &WebhookMessage) -> Value {
    let Some(phone) = extract::caller_phone(msg) else {
        return ignored(&msg.kind, "no caller phone number");
    };

    let messages = extract::transcript(msg);
    let thread_id = thread_key(phone, extract::call_id(msg).unwrap_or("unknown"));

    let persister = TranscriptPersister::new(
        state.store.clone(),
        state.outbox.clone(),
        state.config.transcript.max_message_chars,
    );

    // The platform does not act on this response; internal failures are
    // logged (and outboxed) but the webhook is always acknowledged.
    match persister.save(phone, &thread_id, messages).await {
        Ok(count) => {
            tracing::info!(user_id = phone, thread_id = %thread_id, messages_saved = count, "call persisted");
        }
        Err(e) => {
            tracing::error!(user_id = phone, thread_id = %thread_id, error = %e, "call persistence failed");
        }
    }

    json!({ "status": "success" })
}

fn ignored(event_type: &str, reason: &str) -> Value {
    TraceEvent::WebhookIgnored {
        event_type: event_type.to_string(),
        reason: reason.to_string(),
    }
    .emit();
    json!({ "status": "ignored" })
}
