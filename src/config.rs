use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration, assembled from environment variables.
///
/// `ZEP_API_KEY` is the one required setting; everything else has a
/// deployment-friendly default. `PORT` overrides the listen port (the
/// hosting platform injects it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub zep: ZepConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
    #[serde(default)]
    pub outbox: OutboxConfig,
}

// ── Server ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

// ── Zep Cloud connection ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZepConfig {
    /// Base URL of the Zep Cloud REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key for authentication. Required at startup.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Max retries on transient failures (5xx / network).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

// ── Transcript handling ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Maximum chars per message before truncation.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

// ── Outbox ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Append-only log of transcript batches that failed to persist.
    #[serde(default = "default_outbox_path")]
    pub path: PathBuf,

    /// Seconds between background drain passes.
    #[serde(default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,
}

// ── Defaults ───────────────────────────────────────────────────────

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_base_url() -> String {
    "https://api.getzep.com/api/v2".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    1
}
fn default_max_message_chars() -> usize {
    2_500
}
fn default_outbox_path() -> PathBuf {
    PathBuf::from("./data/outbox.jsonl")
}
fn default_drain_interval_secs() -> u64 {
    60
}

// ── Default impls ──────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            zep: ZepConfig::default(),
            transcript: TranscriptConfig::default(),
            outbox: OutboxConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for ZepConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
        }
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            path: default_outbox_path(),
            drain_interval_secs: default_drain_interval_secs(),
        }
    }
}

impl Config {
    /// Build configuration from the process environment.
    ///
    /// Fails if `ZEP_API_KEY` is absent or empty — the service is
    /// useless without the memory store, so it refuses to start.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        match std::env::var("ZEP_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                config.zep.api_key = Some(key);
            }
            _ => {
                return Err(Error::Config(
                    "ZEP_API_KEY environment variable is required".into(),
                ));
            }
        }

        if let Ok(url) = std::env::var("ZEP_BASE_URL") {
            if !url.trim().is_empty() {
                config.zep.base_url = url.trim_end_matches('/').to_string();
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("invalid PORT value {port:?}: {e}")))?;
        }

        if let Ok(path) = std::env::var("OUTBOX_PATH") {
            if !path.trim().is_empty() {
                config.outbox.path = PathBuf::from(path);
            }
        }

        Ok(config)
    }
}
