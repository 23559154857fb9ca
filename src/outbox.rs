use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::memory::reconcile::Reconciler;
use crate::memory::store::MemoryStore;
use crate::memory::types::StoredMessage;
use crate::trace::TraceEvent;

/// A transcript batch whose append failed, waiting to be replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAppend {
    pub user_id: String,
    pub thread_id: String,
    pub messages: Vec<StoredMessage>,
    pub queued_at: String,
}

impl PendingAppend {
    pub fn new(user_id: &str, thread_id: &str, messages: Vec<StoredMessage>) -> Self {
        Self {
            user_id: user_id.to_string(),
            thread_id: thread_id.to_string(),
            messages,
            queued_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Durable retry log for failed transcript appends.
///
/// One JSON entry per line in an append-only file. `drain` replays
/// every pending entry through the normal reconcile-then-append path
/// and rewrites the file with whatever still fails, so a transient
/// store outage does not lose a conversation.
pub struct Outbox {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Outbox {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Park a failed append for later replay.
    pub async fn enqueue(&self, entry: PendingAppend) -> Result<()> {
        let _guard = self.lock.lock().await;

        let line = serde_json::to_string(&entry)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.sync_all()?;

        TraceEvent::OutboxEnqueued {
            thread_id: entry.thread_id.clone(),
            messages: entry.messages.len(),
        }
        .emit();

        Ok(())
    }

    /// Number of entries currently pending.
    pub async fn pending(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.load()?.len())
    }

    /// Replay pending entries against the store. Returns
    /// `(replayed, remaining)`. Safe to call repeatedly.
    pub async fn drain(&self, store: &Arc<dyn MemoryStore>) -> Result<(usize, usize)> {
        let _guard = self.lock.lock().await;

        let pending = self.load()?;
        if pending.is_empty() {
            return Ok((0, 0));
        }

        let reconciler = Reconciler::new(store.clone());
        let mut remaining = Vec::new();
        let mut replayed = 0;

        for entry in pending {
            let outcome = async {
                reconciler.ensure(&entry.user_id, &entry.thread_id).await?;
                store
                    .add_messages(&entry.thread_id, entry.messages.clone())
                    .await
            }
            .await;

            match outcome {
                Ok(()) => {
                    replayed += 1;
                    tracing::info!(
                        thread_id = %entry.thread_id,
                        messages = entry.messages.len(),
                        "outbox entry replayed"
                    );
                }
                Err(e) => {
                    tracing::warn!(thread_id = %entry.thread_id, error = %e, "outbox replay failed");
                    remaining.push(entry);
                }
            }
        }

        self.rewrite(&remaining)?;

        TraceEvent::OutboxDrained {
            replayed,
            remaining: remaining.len(),
        }
        .emit();

        Ok((replayed, remaining.len()))
    }

    fn load(&self) -> Result<Vec<PendingAppend>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let mut entries = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<PendingAppend>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    // A corrupt line must not wedge the whole outbox.
                    tracing::error!(error = %e, "skipping unreadable outbox line");
                }
            }
        }
        Ok(entries)
    }

    fn rewrite(&self, entries: &[PendingAppend]) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        let mut content = String::new();
        for entry in entries {
            content.push_str(&serde_json::to_string(entry)?);
            content.push('\n');
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Spawn the periodic drain loop.
pub fn spawn_drain_task(outbox: Arc<Outbox>, store: Arc<dyn MemoryStore>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        // First tick fires immediately, which doubles as startup recovery.
        loop {
            interval.tick().await;
            match outbox.drain(&store).await {
                Ok((0, 0)) => {}
                Ok((replayed, remaining)) => {
                    tracing::info!(replayed, remaining, "outbox drain pass complete");
                }
                Err(e) => {
                    tracing::error!(error = %e, "outbox drain pass failed");
                }
            }
        }
    });
}
