//! Audit store backends.
//!
//! The sink only needs two primitives from the key-value store: append one
//! element to a list, and set a TTL on the list's key. `UpstashStore` speaks
//! the Upstash Redis REST protocol (one command per POST, bearer auth);
//! `MemoryStore` stands in when no store is configured and in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected command: {0}")]
    Command(String),
    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one element to the list at `key` (RPUSH semantics; safe for
    /// concurrent writers, ordering left to the store).
    async fn rpush(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Set/refresh the expiry of `key` in seconds.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError>;
}

/// Upstash Redis over its REST API.
pub struct UpstashStore {
    base: String,
    token: String,
    client: reqwest::Client,
}

impl UpstashStore {
    pub fn new(base: &str, token: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Issue a single Redis command as a JSON array, e.g. ["RPUSH", key, v].
    async fn command(&self, command: Value) -> Result<(), StoreError> {
        let response = self
            .client
            .post(&self.base)
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Command(format!("{}: {}", status, body)));
        }

        // Upstash reports command-level failures as {"error": "..."} with 200.
        let body: Value = response.json().await?;
        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(StoreError::Command(error.to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl AuditStore for UpstashStore {
    async fn rpush(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.command(json!(["RPUSH", key, value])).await
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        self.command(json!(["EXPIRE", key, ttl_secs])).await
    }
}

/// In-process fallback used when Upstash is unconfigured, and in tests.
/// Records are lost on restart; TTLs are tracked but never enforced.
#[derive(Default)]
pub struct MemoryStore {
    lists: Mutex<HashMap<String, Vec<String>>>,
    ttls: Mutex<HashMap<String, u64>>,
}

impl MemoryStore {
    pub fn list(&self, key: &str) -> Vec<String> {
        self.lists
            .lock()
            .expect("memory store lock poisoned")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn ttl(&self, key: &str) -> Option<u64> {
        self.ttls
            .lock()
            .expect("memory store lock poisoned")
            .get(key)
            .copied()
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn rpush(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.lists
            .lock()
            .expect("memory store lock poisoned")
            .entry(key.to_string())
            .or_default()
            .push(value);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        self.ttls
            .lock()
            .expect("memory store lock poisoned")
            .insert(key.to_string(), ttl_secs);
        Ok(())
    }
}
