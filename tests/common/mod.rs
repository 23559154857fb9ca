//! In-memory `MemoryStore` fake with per-operation failure toggles and
//! call counters, shared by the integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use ranchline::config::Config;
use ranchline::error::{Error, Result};
use ranchline::memory::store::MemoryStore;
use ranchline::memory::types::{
    ContextBlock, FactRecord, Identity, Role, StoredMessage, Thread,
};
use ranchline::outbox::Outbox;
use ranchline::AppState;

#[derive(Debug, Clone)]
pub struct ThreadRecord {
    pub thread_id: String,
    pub user_id: String,
    pub messages: Vec<StoredMessage>,
}

#[derive(Default)]
pub struct FakeState {
    pub users: HashMap<String, Identity>,
    pub threads: Vec<ThreadRecord>,
    pub graph: HashMap<String, Vec<serde_json::Value>>,

    // Call counters
    pub create_user_calls: usize,
    pub create_thread_calls: usize,
    pub append_calls: usize,

    // Failure toggles
    pub fail_get_user: bool,
    pub fail_context: bool,
    pub fail_recent: bool,
    pub fail_append: bool,
    pub fail_graph: bool,

    /// Mirror the real store: a context read against a thread that was
    /// never created is an error, not an empty result.
    pub context_requires_thread: bool,
}

#[derive(Default)]
pub struct FakeStore {
    pub state: Mutex<FakeState>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_user(self: Arc<Self>, user_id: &str) -> Arc<Self> {
        self.state.lock().users.insert(
            user_id.to_string(),
            Identity {
                user_id: user_id.to_string(),
                first_name: Some("Montana".into()),
                last_name: Some("Rancher".into()),
                metadata: None,
            },
        );
        self
    }

    pub fn thread(&self, thread_id: &str) -> Option<ThreadRecord> {
        self.state
            .lock()
            .threads
            .iter()
            .find(|t| t.thread_id == thread_id)
            .cloned()
    }
}

fn store_err(op: &str) -> Error {
    Error::Store(format!("injected {op} failure"))
}

#[async_trait]
impl MemoryStore for FakeStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<Identity>> {
        let state = self.state.lock();
        if state.fail_get_user {
            return Err(store_err("get_user"));
        }
        Ok(state.users.get(user_id).cloned())
    }

    async fn create_user(
        &self,
        user_id: &str,
        first_name: &str,
        last_name: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Identity> {
        let mut state = self.state.lock();
        state.create_user_calls += 1;
        let identity = Identity {
            user_id: user_id.to_string(),
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            metadata,
        };
        state.users.insert(user_id.to_string(), identity.clone());
        Ok(identity)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        let state = self.state.lock();
        Ok(state
            .threads
            .iter()
            .find(|t| t.thread_id == thread_id)
            .map(|t| Thread {
                thread_id: t.thread_id.clone(),
                user_id: t.user_id.clone(),
            }))
    }

    async fn create_thread(&self, thread_id: &str, user_id: &str) -> Result<Thread> {
        let mut state = self.state.lock();
        state.create_thread_calls += 1;
        state.threads.push(ThreadRecord {
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
            messages: Vec::new(),
        });
        Ok(Thread {
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
        })
    }

    async fn add_messages(&self, thread_id: &str, messages: Vec<StoredMessage>) -> Result<()> {
        let mut state = self.state.lock();
        state.append_calls += 1;
        if state.fail_append {
            return Err(store_err("add_messages"));
        }
        let thread = state
            .threads
            .iter_mut()
            .find(|t| t.thread_id == thread_id)
            .ok_or_else(|| Error::Store(format!("thread {thread_id} does not exist")))?;
        thread.messages.extend(messages);
        Ok(())
    }

    async fn user_context(&self, user_id: &str, thread_id: &str) -> Result<ContextBlock> {
        let state = self.state.lock();
        if state.fail_context {
            return Err(store_err("user_context"));
        }
        if state.context_requires_thread
            && !state.threads.iter().any(|t| t.thread_id == thread_id)
        {
            return Err(Error::Store(format!("thread {thread_id} does not exist")));
        }

        let mut facts = Vec::new();
        let mut fragments = Vec::new();
        for thread in state.threads.iter().filter(|t| t.user_id == user_id) {
            for msg in &thread.messages {
                fragments.push(msg.content.clone());
                if msg.role == Role::Caller {
                    facts.push(format!("Caller said: {}", msg.content));
                }
            }
        }

        let context = if fragments.is_empty() {
            None
        } else {
            Some(format!("Previous conversations: {}", fragments.join("; ")))
        };
        Ok(ContextBlock { context, facts })
    }

    async fn recent_messages(&self, user_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        let state = self.state.lock();
        if state.fail_recent {
            return Err(store_err("recent_messages"));
        }
        let latest = state
            .threads
            .iter()
            .rev()
            .find(|t| t.user_id == user_id && !t.messages.is_empty());
        Ok(latest
            .map(|t| t.messages.iter().rev().take(limit).rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn graph_add(&self, user_id: &str, data: serde_json::Value) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_graph {
            return Err(store_err("graph_add"));
        }
        state.graph.entry(user_id.to_string()).or_default().push(data);
        Ok(())
    }

    async fn graph_search(
        &self,
        user_id: &str,
        _query: &str,
        limit: usize,
    ) -> Result<Vec<FactRecord>> {
        let state = self.state.lock();
        if state.fail_graph {
            return Err(store_err("graph_search"));
        }
        Ok(state
            .graph
            .get(user_id)
            .map(|entries| {
                entries
                    .iter()
                    .take(limit)
                    .map(|e| FactRecord {
                        fact: e.to_string(),
                        created_at: None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// App state wired to the fake store and a temp-dir outbox. The
/// returned guard keeps the temp dir alive for the test's duration.
pub fn test_state(store: Arc<FakeStore>) -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let outbox = Outbox::new(dir.path().join("outbox.jsonl")).expect("outbox");
    let state = AppState {
        config: Arc::new(Config::default()),
        store,
        outbox: Arc::new(outbox),
    };
    (state, dir)
}
