use serde::{Deserialize, Serialize};

/// Speaker label attached to caller-side messages on the Zep wire.
pub const CALLER_NAME: &str = "Caller";
/// Speaker label attached to agent-side messages on the Zep wire.
pub const AGENT_NAME: &str = "Montana Feed Agent";

// ── Conversation roles ─────────────────────────────────────────────

/// Binary message role. Upstream payloads carry a zoo of role strings;
/// only the caller tag is recognized, everything else is the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    Caller,
    #[serde(rename = "assistant")]
    Agent,
}

impl Role {
    pub fn speaker_name(self) -> &'static str {
        match self {
            Role::Caller => CALLER_NAME,
            Role::Agent => AGENT_NAME,
        }
    }
}

/// A normalized transcript message, as produced by payload extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,
    pub content: String,
}

/// A message in the shape the memory store accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    pub name: String,
}

// ── Store entities ─────────────────────────────────────────────────

/// A caller identity as the memory store knows it, keyed by phone number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// A conversation thread owned by one identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub user_id: String,
}

/// Aggregated memory context for a caller, as returned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBlock {
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub facts: Vec<String>,
}

/// A single extracted fact (a graph edge) with its creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactRecord {
    pub fact: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

// ── Caller-facing context payload ──────────────────────────────────

/// Greeting-ready context for one caller. Every retrieval tier produces
/// one of these; the webhook and REST paths serialize it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerContext {
    pub success: bool,
    pub is_new_caller: bool,
    pub session_id: String,
    pub context: String,
    #[serde(default)]
    pub facts: Vec<String>,
    pub message: String,
}

// ── Structured ranch data ──────────────────────────────────────────

/// Free-form structured data about a caller's operation, merged into
/// their graph. Unset fields are left untouched (last-write-wins per
/// field is the store's merge behavior).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RanchData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub herd_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialist_name: Option<String>,
}

impl RanchData {
    pub fn is_empty(&self) -> bool {
        self.ranch_name.is_none()
            && self.location.is_none()
            && self.herd_size.is_none()
            && self.operation_type.is_none()
            && self.specialist_name.is_none()
    }
}
