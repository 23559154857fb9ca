use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::ZepConfig;
use crate::error::{Error, Result};
use crate::memory::store::MemoryStore;
use crate::memory::types::{ContextBlock, FactRecord, Identity, Role, StoredMessage, Thread};
use crate::trace::TraceEvent;

/// Typed HTTP client for the Zep Cloud v3 REST API.
///
/// Wraps the user, thread, and graph endpoints with bounded retry on
/// transient failures and structured tracing per call. Not-found on
/// GETs is reported as `Ok(None)`, never conflated with store errors.
pub struct ZepClient {
    http: reqwest::Client,
    config: ZepConfig,
}

impl ZepClient {
    pub fn new(config: ZepConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key = config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("Zep API key is not set".into()))?;
        let val = HeaderValue::from_str(&format!("Api-Key {key}"))
            .map_err(|e| Error::Config(format!("invalid API key header: {e}")))?;
        headers.insert(AUTHORIZATION, val);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;

        Ok(Self { http, config })
    }

    // ── Internal HTTP helpers with retry + tracing ─────────────────

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, path);

        let mut last_err = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_secs(2u64.pow(attempt));
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = self.http.post(&url).json(body).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    TraceEvent::StoreCall {
                        endpoint: path.to_string(),
                        status,
                        duration_ms,
                    }
                    .emit();

                    if resp.status().is_success() {
                        let parsed: Resp = resp.json().await?;
                        return Ok(parsed);
                    }

                    let err_text = resp.text().await.unwrap_or_default();
                    let err = Error::Store(format!("{path} returned {status}: {err_text}"));

                    if !is_retryable_status(status) {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
                Err(e) => {
                    TraceEvent::StoreCall {
                        endpoint: path.to_string(),
                        status: 0,
                        duration_ms,
                    }
                    .emit();
                    last_err = Some(Error::Http(e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Store("max retries exceeded".into())))
    }

    /// GET with the same bounded retry as `post_json`, returning
    /// `Ok(None)` on 404 — the tagged not-found outcome, never retried.
    async fn get_json<Resp>(&self, path: &str) -> Result<Option<Resp>>
    where
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, path);

        let mut last_err = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_secs(2u64.pow(attempt));
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = self.http.get(&url).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    TraceEvent::StoreCall {
                        endpoint: path.to_string(),
                        status: status.as_u16(),
                        duration_ms,
                    }
                    .emit();

                    if status == StatusCode::NOT_FOUND {
                        return Ok(None);
                    }
                    if status.is_success() {
                        let parsed: Resp = resp.json().await?;
                        return Ok(Some(parsed));
                    }

                    let err_text = resp.text().await.unwrap_or_default();
                    let err = Error::Store(format!(
                        "GET {path} returned {}: {err_text}",
                        status.as_u16()
                    ));

                    if !is_retryable_status(status.as_u16()) {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
                Err(e) => {
                    TraceEvent::StoreCall {
                        endpoint: path.to_string(),
                        status: 0,
                        duration_ms,
                    }
                    .emit();
                    last_err = Some(Error::Http(e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Store("max retries exceeded".into())))
    }
}

/// Only server-side failures are worth a retry; 4xx outcomes are
/// deterministic and surface immediately.
fn is_retryable_status(status: u16) -> bool {
    status >= 500
}


// ── Wire payloads ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UserPayload {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ThreadPayload {
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    user_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ThreadListPayload {
    #[serde(default)]
    threads: Vec<ThreadPayload>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MessageListPayload {
    #[serde(default)]
    messages: Vec<MessagePayload>,
}

#[derive(Debug, Default, Deserialize)]
struct ThreadContextPayload {
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GraphSearchPayload {
    #[serde(default)]
    edges: Vec<GraphEdgePayload>,
}

#[derive(Debug, Deserialize)]
struct GraphEdgePayload {
    #[serde(default)]
    fact: String,
    #[serde(default)]
    created_at: Option<String>,
}

fn parse_role(role: &str) -> Role {
    if role == "user" {
        Role::Caller
    } else {
        Role::Agent
    }
}

impl From<UserPayload> for Identity {
    fn from(p: UserPayload) -> Self {
        Identity {
            user_id: p.user_id,
            first_name: p.first_name,
            last_name: p.last_name,
            metadata: p.metadata,
        }
    }
}

// ── MemoryStore over the Zep REST API ──────────────────────────────

#[async_trait::async_trait]
impl MemoryStore for ZepClient {
    async fn get_user(&self, user_id: &str) -> Result<Option<Identity>> {
        let payload: Option<UserPayload> = self.get_json(&format!("/users/{user_id}")).await?;
        Ok(payload.map(Identity::from))
    }

    async fn create_user(
        &self,
        user_id: &str,
        first_name: &str,
        last_name: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Identity> {
        let body = serde_json::json!({
            "user_id": user_id,
            "first_name": first_name,
            "last_name": last_name,
            "metadata": metadata,
        });
        let payload: UserPayload = self.post_json("/users", &body).await?;
        let mut identity = Identity::from(payload);
        if identity.user_id.is_empty() {
            identity.user_id = user_id.to_string();
        }
        Ok(identity)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        let payload: Option<ThreadPayload> =
            self.get_json(&format!("/threads/{thread_id}")).await?;
        Ok(payload.map(|p| Thread {
            thread_id: if p.thread_id.is_empty() {
                thread_id.to_string()
            } else {
                p.thread_id
            },
            user_id: p.user_id,
        }))
    }

    async fn create_thread(&self, thread_id: &str, user_id: &str) -> Result<Thread> {
        let body = serde_json::json!({
            "thread_id": thread_id,
            "user_id": user_id,
        });
        let _: serde_json::Value = self.post_json("/threads", &body).await?;
        Ok(Thread {
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
        })
    }

    async fn add_messages(&self, thread_id: &str, messages: Vec<StoredMessage>) -> Result<()> {
        let body = serde_json::json!({ "messages": messages });
        let _: serde_json::Value = self
            .post_json(&format!("/threads/{thread_id}/messages"), &body)
            .await?;
        Ok(())
    }

    async fn user_context(&self, user_id: &str, thread_id: &str) -> Result<ContextBlock> {
        let payload: Option<ThreadContextPayload> = self
            .get_json(&format!("/threads/{thread_id}/context"))
            .await?;
        let context = payload
            .ok_or_else(|| Error::Store(format!("thread {thread_id} has no context")))?
            .context;

        // Facts are best-effort enrichment on top of the context string.
        let facts = match self.graph_search(user_id, "caller background", 5).await {
            Ok(records) => records.into_iter().map(|r| r.fact).collect(),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "fact lookup failed, serving context only");
                Vec::new()
            }
        };

        Ok(ContextBlock { context, facts })
    }

    async fn recent_messages(&self, user_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        let threads: ThreadListPayload = self
            .get_json(&format!("/users/{user_id}/threads"))
            .await?
            .unwrap_or_default();

        // The listing is oldest-first; the last entry is the latest call.
        let latest = match threads.threads.last() {
            Some(t) => t.thread_id.clone(),
            None => return Ok(Vec::new()),
        };

        let listing: MessageListPayload = self
            .get_json(&format!("/threads/{latest}/messages?limit={limit}"))
            .await?
            .unwrap_or_default();

        Ok(listing
            .messages
            .into_iter()
            .map(|m| {
                let role = parse_role(&m.role);
                StoredMessage {
                    role,
                    content: m.content,
                    name: m.name.unwrap_or_else(|| role.speaker_name().to_string()),
                }
            })
            .collect())
    }

    async fn graph_add(&self, user_id: &str, data: serde_json::Value) -> Result<()> {
        let body = serde_json::json!({
            "user_id": user_id,
            "type": "json",
            "data": data.to_string(),
        });
        let _: serde_json::Value = self.post_json("/graph", &body).await?;
        Ok(())
    }

    async fn graph_search(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FactRecord>> {
        let body = serde_json::json!({
            "user_id": user_id,
            "query": query,
            "scope": "edges",
            "limit": limit,
        });
        let payload: GraphSearchPayload = self.post_json("/graph/search", &body).await?;
        Ok(payload
            .edges
            .into_iter()
            .filter(|e| !e.fact.is_empty())
            .map(|e| FactRecord {
                fact: e.fact,
                created_at: e.created_at,
            })
            .collect())
    }
}
