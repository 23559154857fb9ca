use std::sync::Arc;

use crate::error::Result;
use crate::memory::reconcile::Reconciler;
use crate::memory::store::MemoryStore;
use crate::memory::types::{StoredMessage, TranscriptMessage};
use crate::outbox::{Outbox, PendingAppend};
use crate::trace::TraceEvent;

/// Appended to messages that exceed the per-message cap.
pub const TRUNCATION_MARKER: &str = "… [truncated]";

/// Writes normalized transcripts into a caller's thread.
///
/// Persistence failure is NOT swallowed: losing a transcript silently
/// is worse than a failed acknowledgement. A failed append is parked in
/// the outbox before the error surfaces, so a store outage does not
/// drop the conversation.
pub struct TranscriptPersister {
    store: Arc<dyn MemoryStore>,
    outbox: Arc<Outbox>,
    max_message_chars: usize,
}

impl TranscriptPersister {
    pub fn new(store: Arc<dyn MemoryStore>, outbox: Arc<Outbox>, max_message_chars: usize) -> Self {
        Self {
            store,
            outbox,
            max_message_chars,
        }
    }

    /// Persist a transcript. Returns the number of messages saved.
    ///
    /// An empty transcript is a no-op, not an error — calls with no
    /// captured content happen routinely.
    pub async fn save(
        &self,
        phone: &str,
        thread_id: &str,
        messages: Vec<TranscriptMessage>,
    ) -> Result<usize> {
        if messages.is_empty() {
            tracing::info!(user_id = phone, thread_id, "empty transcript, nothing to save");
            return Ok(0);
        }

        let (stored, truncated) = self.prepare(messages);
        let count = stored.len();

        let reconciler = Reconciler::new(self.store.clone());
        reconciler.ensure(phone, thread_id).await?;

        if let Err(e) = self.store.add_messages(thread_id, stored.clone()).await {
            tracing::error!(user_id = phone, thread_id, error = %e, "transcript append failed");
            if let Err(enqueue_err) = self
                .outbox
                .enqueue(PendingAppend::new(phone, thread_id, stored))
                .await
            {
                tracing::error!(thread_id, error = %enqueue_err, "outbox enqueue failed");
            }
            return Err(e);
        }

        TraceEvent::TranscriptSaved {
            user_id: phone.to_string(),
            thread_id: thread_id.to_string(),
            messages_saved: count,
            messages_truncated: truncated,
        }
        .emit();

        Ok(count)
    }

    /// Convert to the store's message shape, applying the per-message cap.
    fn prepare(&self, messages: Vec<TranscriptMessage>) -> (Vec<StoredMessage>, usize) {
        let mut truncated = 0;
        let stored = messages
            .into_iter()
            .map(|m| {
                let (content, was_truncated) = truncate_content(&m.content, self.max_message_chars);
                if was_truncated {
                    truncated += 1;
                }
                StoredMessage {
                    role: m.role,
                    content,
                    name: m.role.speaker_name().to_string(),
                }
            })
            .collect();
        (stored, truncated)
    }
}

/// Cap `content` at `max_chars`, marker included in the budget.
fn truncate_content(content: &str, max_chars: usize) -> (String, bool) {
    if content.chars().count() <= max_chars {
        return (content.to_string(), false);
    }

    let marker_chars = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_chars {
        // Cap too small for the marker: a bare prefix still honors it.
        return (content.chars().take(max_chars).collect(), true);
    }

    let mut out: String = content.chars().take(max_chars - marker_chars).collect();
    out.push_str(TRUNCATION_MARKER);
    (out, true)
}
