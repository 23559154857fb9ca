//! Payload extraction: locating caller identity, call identity, and the
//! transcript inside an inconsistently nested webhook envelope.
//!
//! Each value is resolved by checking candidate locations in a fixed
//! precedence order and taking the first non-empty hit:
//!
//! - transcript array: `message.messages` → `message.transcript`
//!   → `message.call.messages`
//! - per-message text: `content` → `text` → `message`
//!
//! Records with no resolvable text carry no information and are
//! dropped silently. The role field is classified binarily: `"user"`
//! is the caller, everything else is the agent.

use serde_json::Value;

use crate::memory::types::{Role, TranscriptMessage};
use crate::vapi::types::{ToolCall, WebhookMessage};

/// Caller phone number from `message.call.customer.number`.
pub fn caller_phone(msg: &WebhookMessage) -> Option<&str> {
    msg.call
        .as_ref()?
        .customer
        .as_ref()?
        .number
        .as_deref()
        .filter(|n| !n.trim().is_empty())
}

/// Call identifier from `message.call.id`.
pub fn call_id(msg: &WebhookMessage) -> Option<&str> {
    msg.call
        .as_ref()?
        .id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
}

/// Raw transcript records, first non-empty candidate location wins.
pub fn raw_transcript(msg: &WebhookMessage) -> Option<&[Value]> {
    let candidates = [
        msg.messages.as_deref(),
        msg.transcript.as_deref(),
        msg.call.as_ref().and_then(|c| c.messages.as_deref()),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|records| !records.is_empty())
}

/// Normalize raw records into role/content pairs, preserving order.
pub fn normalize(records: &[Value]) -> Vec<TranscriptMessage> {
    records
        .iter()
        .filter_map(|record| {
            let content = message_text(record)?;
            let role = match record.get("role").and_then(Value::as_str) {
                Some("user") => Role::Caller,
                _ => Role::Agent,
            };
            Some(TranscriptMessage {
                role,
                content: content.to_string(),
            })
        })
        .collect()
}

/// Extract and normalize in one step.
pub fn transcript(msg: &WebhookMessage) -> Vec<TranscriptMessage> {
    raw_transcript(msg).map(normalize).unwrap_or_default()
}

/// Message text: `content` → `text` → `message`, first non-empty wins.
fn message_text(record: &Value) -> Option<&str> {
    ["content", "text", "message"]
        .into_iter()
        .filter_map(|field| record.get(field).and_then(Value::as_str))
        .find(|text| !text.trim().is_empty())
}

/// The first requested tool call, across the shapes producers use:
/// `toolCallList` → `toolCalls` → `toolWithToolCallList[*].toolCall`.
pub fn first_tool_call(msg: &WebhookMessage) -> Option<&ToolCall> {
    if let Some(call) = msg.tool_call_list.as_ref().and_then(|l| l.first()) {
        return Some(call);
    }
    if let Some(call) = msg.tool_calls.as_ref().and_then(|l| l.first()) {
        return Some(call);
    }
    msg.tool_with_tool_call_list
        .as_ref()?
        .iter()
        .find_map(|t| t.tool_call.as_ref())
}

/// Tool-call arguments as a JSON object, decoding the string-encoded
/// variant some producer versions send.
pub fn tool_arguments(call: &ToolCall) -> Value {
    match call.function.as_ref().and_then(|f| f.arguments.clone()) {
        Some(Value::String(s)) => serde_json::from_str(&s).unwrap_or(Value::Null),
        Some(v) => v,
        None => Value::Null,
    }
}
