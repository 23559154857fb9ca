use serde::Serialize;

/// Structured trace events emitted along the webhook and memory paths.
/// These integrate with the `tracing` crate and are machine-parseable.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    /// Emitted on every Zep REST call.
    StoreCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },

    /// Emitted after a transcript batch is appended to a thread.
    TranscriptSaved {
        user_id: String,
        thread_id: String,
        messages_saved: usize,
        messages_truncated: usize,
    },

    /// Emitted when a caller context is served, with the degradation
    /// tier that produced it (1 = new caller, 2 = full context,
    /// 3 = recent-message summary, 4 = generic fallback).
    ContextServed {
        user_id: String,
        tier: u8,
        is_new_caller: bool,
        fact_count: usize,
    },

    /// Emitted when a webhook carries too little to act on.
    WebhookIgnored {
        event_type: String,
        reason: String,
    },

    /// Emitted for webhook types this service does not handle.
    WebhookUnhandled { event_type: String },

    /// Emitted when a failed append is parked in the outbox.
    OutboxEnqueued {
        thread_id: String,
        messages: usize,
    },

    /// Emitted after an outbox drain pass.
    OutboxDrained {
        replayed: usize,
        remaining: usize,
    },
}

impl TraceEvent {
    /// Emit this event as a tracing span event.
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ranchline_event");
    }
}
