use std::sync::Arc;

use crate::error::Result;
use crate::memory::store::MemoryStore;

/// Placeholder name for callers whose real name was never captured.
const DEFAULT_FIRST_NAME: &str = "Montana";
const DEFAULT_LAST_NAME: &str = "Rancher";

/// Deterministic thread key for one call: `mfc_{phone}_{call_id}`.
pub fn thread_key(phone: &str, call_id: &str) -> String {
    format!("mfc_{phone}_{call_id}")
}

/// Get-then-create-on-miss reconciliation for identities and threads.
///
/// This is the only place existence is mutated. Both operations are
/// idempotent: a hit is a no-op, and a create that loses a concurrent
/// first-touch race is swallowed (the store deduplicates by key).
/// Transient lookup failures are NOT treated as a miss — they surface,
/// and callers decide whether to degrade.
pub struct Reconciler {
    store: Arc<dyn MemoryStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    /// Ensure the caller identity exists. Returns whether it already did.
    pub async fn ensure_user(&self, phone: &str) -> Result<bool> {
        if self.store.get_user(phone).await?.is_some() {
            return Ok(true);
        }

        let metadata = serde_json::json!({ "source": "vapi", "phone": phone });
        match self
            .store
            .create_user(phone, DEFAULT_FIRST_NAME, DEFAULT_LAST_NAME, Some(metadata))
            .await
        {
            Ok(_) => {
                tracing::info!(user_id = phone, "created caller identity");
            }
            Err(e) => {
                // Benign race: a concurrent first-touch got there first.
                tracing::warn!(user_id = phone, error = %e, "user create failed, assuming it exists");
            }
        }
        Ok(false)
    }

    /// Ensure a thread exists under the caller. Returns whether it already did.
    pub async fn ensure_thread(&self, thread_id: &str, phone: &str) -> Result<bool> {
        if self.store.get_thread(thread_id).await?.is_some() {
            return Ok(true);
        }

        match self.store.create_thread(thread_id, phone).await {
            Ok(_) => {
                tracing::info!(thread_id, user_id = phone, "created conversation thread");
            }
            Err(e) => {
                tracing::warn!(thread_id, error = %e, "thread create failed, assuming it exists");
            }
        }
        Ok(false)
    }

    /// Full reconciliation before a write: identity first, then thread.
    pub async fn ensure(&self, phone: &str, thread_id: &str) -> Result<()> {
        self.ensure_user(phone).await?;
        self.ensure_thread(thread_id, phone).await?;
        Ok(())
    }
}
