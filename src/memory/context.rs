use std::sync::Arc;

use crate::memory::reconcile::{thread_key, Reconciler};
use crate::memory::store::MemoryStore;
use crate::memory::types::{CallerContext, StoredMessage};
use crate::trace::TraceEvent;

/// Opening instruction handed to the agent for a first-time caller.
const NEW_CALLER_PROMPT: &str = "This is a new caller. Be welcoming and friendly. \
    Ask about their operation - herd size, location, and what they need help with today.";

/// Served when the caller is known but nothing richer could be fetched.
const RETURNING_NO_DETAILS: &str = "Returning caller - welcome them back but no previous \
    conversation details available.";

/// Maximum facts forwarded to the agent per retrieval.
const MAX_FACTS: usize = 5;

/// How many recent messages the reduced-retrieval tier pulls.
const RECENT_MESSAGE_LIMIT: usize = 6;

/// Per-snippet cap when synthesizing a summary from raw messages.
const SNIPPET_CHARS: usize = 160;

/// Produces a greeting-ready context for a caller with tiered fallback.
///
/// The ladder, each tier degrading to the next on failure:
/// 1. unknown caller → create identity + thread, fixed onboarding prompt
/// 2. known caller   → full store context plus top facts
/// 3. full context failed → recent raw messages, speaker-labeled summary
/// 4. that failed too → generic returning-caller string
///
/// No tier ever errors outward. A usable greeting always comes back;
/// richness is sacrificed before availability.
pub struct ContextRetriever {
    store: Arc<dyn MemoryStore>,
}

impl ContextRetriever {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    pub async fn fetch(&self, phone: &str, call_id: Option<&str>) -> CallerContext {
        let session_id = thread_key(phone, call_id.unwrap_or("current"));

        match self.store.get_user(phone).await {
            Ok(Some(_)) => self.returning_caller(phone, session_id).await,
            Ok(None) => self.first_touch(phone, session_id).await,
            Err(e) => {
                // Ambiguous: the store errored, we don't know the caller
                // either way. Don't create anything, serve the generic tier.
                tracing::warn!(user_id = phone, error = %e, "identity lookup failed");
                self.generic(phone, session_id)
            }
        }
    }

    // ── Tier 1: first contact ──────────────────────────────────────

    async fn first_touch(&self, phone: &str, session_id: String) -> CallerContext {
        let reconciler = Reconciler::new(self.store.clone());
        if let Err(e) = reconciler.ensure(phone, &session_id).await {
            // First-touch creation is best-effort; the greeting still goes out.
            tracing::warn!(user_id = phone, error = %e, "first-touch creation failed");
        }

        TraceEvent::ContextServed {
            user_id: phone.to_string(),
            tier: 1,
            is_new_caller: true,
            fact_count: 0,
        }
        .emit();

        CallerContext {
            success: true,
            is_new_caller: true,
            session_id,
            context: NEW_CALLER_PROMPT.to_string(),
            facts: Vec::new(),
            message: "New caller - no previous history".to_string(),
        }
    }

    // ── Tiers 2-4: known caller ────────────────────────────────────

    async fn returning_caller(&self, phone: &str, session_id: String) -> CallerContext {
        // Reconcile before the read: the current call's thread does not
        // exist yet for a returning caller, and the store 404s a context
        // read against a missing thread. Failure here just lets the
        // ladder degrade below.
        let reconciler = Reconciler::new(self.store.clone());
        if let Err(e) = reconciler.ensure_thread(&session_id, phone).await {
            tracing::warn!(user_id = phone, error = %e, "thread reconciliation failed before context read");
        }

        match self.store.user_context(phone, &session_id).await {
            Ok(block) => {
                let mut facts = block.facts;
                facts.truncate(MAX_FACTS);
                let context = block
                    .context
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| RETURNING_NO_DETAILS.to_string());

                TraceEvent::ContextServed {
                    user_id: phone.to_string(),
                    tier: 2,
                    is_new_caller: false,
                    fact_count: facts.len(),
                }
                .emit();

                CallerContext {
                    success: true,
                    is_new_caller: false,
                    session_id,
                    context,
                    facts,
                    message: "Returning caller - memory loaded".to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(user_id = phone, error = %e, "full context retrieval failed");
                self.reduced(phone, session_id).await
            }
        }
    }

    async fn reduced(&self, phone: &str, session_id: String) -> CallerContext {
        match self.store.recent_messages(phone, RECENT_MESSAGE_LIMIT).await {
            Ok(messages) if !messages.is_empty() => {
                let context = summarize_snippets(&messages);

                TraceEvent::ContextServed {
                    user_id: phone.to_string(),
                    tier: 3,
                    is_new_caller: false,
                    fact_count: 0,
                }
                .emit();

                CallerContext {
                    success: true,
                    is_new_caller: false,
                    session_id,
                    context,
                    facts: Vec::new(),
                    message: "Returning caller - recent conversation only".to_string(),
                }
            }
            Ok(_) => self.generic(phone, session_id),
            Err(e) => {
                tracing::warn!(user_id = phone, error = %e, "reduced retrieval failed");
                self.generic(phone, session_id)
            }
        }
    }

    fn generic(&self, phone: &str, session_id: String) -> CallerContext {
        TraceEvent::ContextServed {
            user_id: phone.to_string(),
            tier: 4,
            is_new_caller: false,
            fact_count: 0,
        }
        .emit();

        CallerContext {
            success: true,
            is_new_caller: false,
            session_id,
            context: RETURNING_NO_DETAILS.to_string(),
            facts: Vec::new(),
            message: "User exists but memory unavailable".to_string(),
        }
    }
}

/// Concatenate speaker-labeled snippets of the most recent exchange.
fn summarize_snippets(messages: &[StoredMessage]) -> String {
    let mut out = String::from("From the caller's last conversation:\n");
    for msg in messages {
        let mut snippet = msg.content.trim().to_string();
        if snippet.is_empty() {
            continue;
        }
        if snippet.chars().count() > SNIPPET_CHARS {
            snippet = snippet.chars().take(SNIPPET_CHARS).collect();
            snippet.push('…');
        }
        out.push_str(msg.role.speaker_name());
        out.push_str(": ");
        out.push_str(&snippet);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::Role;

    #[test]
    fn snippets_are_labeled_and_capped() {
        let messages = vec![
            StoredMessage {
                role: Role::Caller,
                content: "hello there".into(),
                name: "Caller".into(),
            },
            StoredMessage {
                role: Role::Agent,
                content: "x".repeat(500),
                name: "Montana Feed Agent".into(),
            },
        ];

        let summary = summarize_snippets(&messages);
        assert!(summary.contains("Caller: hello there"));
        assert!(summary.contains("Montana Feed Agent: "));
        // Long agent line is capped to the snippet limit plus the ellipsis.
        let agent_line = summary
            .lines()
            .find(|l| l.starts_with("Montana Feed Agent"))
            .unwrap();
        assert!(agent_line.chars().count() < SNIPPET_CHARS + 30);
    }

    #[test]
    fn blank_messages_are_skipped() {
        let messages = vec![StoredMessage {
            role: Role::Caller,
            content: "   ".into(),
            name: "Caller".into(),
        }];
        let summary = summarize_snippets(&messages);
        assert!(!summary.contains("Caller:"));
    }
}
