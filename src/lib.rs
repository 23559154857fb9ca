pub mod api;
pub mod config;
pub mod error;
pub mod memory;
pub mod outbox;
pub mod trace;
pub mod vapi;

use std::sync::Arc;

use memory::store::MemoryStore;

/// Shared application state passed to all API handlers.
///
/// The memory store is a trait object so tests can swap in a fake;
/// there is no hidden global client.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub store: Arc<dyn MemoryStore>,
    pub outbox: Arc<outbox::Outbox>,
}
