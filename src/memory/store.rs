use async_trait::async_trait;

use crate::error::Result;
use crate::memory::types::{ContextBlock, FactRecord, Identity, StoredMessage, Thread};

/// Operation contract this service needs from the hosted memory store.
///
/// Gets return `Ok(None)` for a true not-found, so callers can tell a
/// miss apart from a transient store failure — only a miss is a create
/// trigger. Dependency-injected everywhere so tests can substitute an
/// in-memory fake.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<Identity>>;

    async fn create_user(
        &self,
        user_id: &str,
        first_name: &str,
        last_name: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Identity>;

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    async fn create_thread(&self, thread_id: &str, user_id: &str) -> Result<Thread>;

    /// Append messages to a thread, in order. The thread must exist.
    async fn add_messages(&self, thread_id: &str, messages: Vec<StoredMessage>) -> Result<()>;

    /// Aggregated context (summary plus ranked facts) for a caller.
    async fn user_context(&self, user_id: &str, thread_id: &str) -> Result<ContextBlock>;

    /// Most recent raw messages across the caller's threads, newest last.
    async fn recent_messages(&self, user_id: &str, limit: usize) -> Result<Vec<StoredMessage>>;

    /// Merge structured data into the caller's graph.
    async fn graph_add(&self, user_id: &str, data: serde_json::Value) -> Result<()>;

    /// Search the caller's graph for facts, in the store's own relevance order.
    async fn graph_search(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FactRecord>>;
}
