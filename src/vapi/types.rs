use serde::Deserialize;

/// Inbound webhook envelope. Everything is optional and defaulted:
/// the upstream platform's payload shape has shifted across versions,
/// and a malformed envelope must still produce a JSON response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub message: WebhookMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookMessage {
    /// Declared event type (`assistant-request`, `end-of-call-report`, …).
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub call: Option<CallInfo>,

    /// Transcript records, payload level. Held raw: individual records
    /// put their text under different field names per producer version.
    #[serde(default)]
    pub messages: Option<Vec<serde_json::Value>>,

    /// Older payloads ship the transcript under this key instead.
    #[serde(default)]
    pub transcript: Option<Vec<serde_json::Value>>,

    #[serde(rename = "toolCallList", default)]
    pub tool_call_list: Option<Vec<ToolCall>>,

    #[serde(rename = "toolCalls", default)]
    pub tool_calls: Option<Vec<ToolCall>>,

    #[serde(rename = "toolWithToolCallList", default)]
    pub tool_with_tool_call_list: Option<Vec<ToolWithToolCall>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallInfo {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub customer: Option<Customer>,

    /// Some payload versions nest the transcript under the call object.
    #[serde(default)]
    pub messages: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub number: Option<String>,
}

/// A structured function-invocation request from the voice platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub function: Option<ToolFunction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolFunction {
    #[serde(default)]
    pub name: String,

    /// Either a JSON object or a JSON-encoded string, depending on version.
    #[serde(default)]
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolWithToolCall {
    #[serde(rename = "toolCall", default)]
    pub tool_call: Option<ToolCall>,
}
