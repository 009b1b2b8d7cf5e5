//! Best-effort audit sink.
//!
//! Events are appended to a daily bucket (`audit:YYYY-MM-DD`) in the
//! key-value store; the bucket's TTL is refreshed after every write. Writes
//! are fire-and-forget: callers never wait on durability and failures are
//! logged and dropped, because audit logging must never block or break the
//! user-facing chat flow.

pub mod store;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use crate::config::{self, AppConfig};
use crate::invites::InviteList;
use store::{AuditStore, MemoryStore, StoreError, UpstashStore};

/// Closed set of audit event kinds, each with its own payload schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Chat page load, reported by the client.
    Visit,
    /// Successful remote session issuance, reported server-side.
    SessionCreated {
        #[serde(skip_serializing_if = "Option::is_none")]
        expires_after: Option<String>,
    },
    /// Client-reported message send. Carries the message length only,
    /// never the content.
    MessageSent { length: u64 },
    /// Client- or server-reported failure details.
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl AuditEvent {
    /// Lenient boundary decoding for client-reported events: unknown or
    /// missing event names become `visit`, missing fields get defaults.
    /// Malformed input is never rejected.
    pub fn from_parts(event: Option<&str>, data: Option<&Value>) -> Self {
        match event {
            Some("session_created") => AuditEvent::SessionCreated {
                expires_after: data
                    .and_then(|d| d.get("expires_after"))
                    .and_then(Value::as_str)
                    .map(String::from),
            },
            Some("message_sent") => AuditEvent::MessageSent {
                length: data
                    .and_then(|d| d.get("length"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0),
            },
            Some("error") => AuditEvent::Error {
                message: data
                    .and_then(|d| d.get("message"))
                    .and_then(Value::as_str)
                    .map(String::from),
            },
            _ => AuditEvent::Visit,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuditEvent::Visit => "visit",
            AuditEvent::SessionCreated { .. } => "session_created",
            AuditEvent::MessageSent { .. } => "message_sent",
            AuditEvent::Error { .. } => "error",
        }
    }
}

/// One stored line: `{ts, who, event, ...event fields}`.
#[derive(Debug, Serialize)]
struct AuditRecord<'a> {
    ts: String,
    who: &'a str,
    #[serde(flatten)]
    event: &'a AuditEvent,
}

/// Daily bucket key, UTC calendar day.
pub fn bucket_key(now: &DateTime<Utc>) -> String {
    format!("audit:{}", now.format("%Y-%m-%d"))
}

pub struct AuditSink {
    store: Arc<dyn AuditStore>,
    invites: InviteList,
    ttl_secs: u64,
}

impl AuditSink {
    pub fn new(store: Arc<dyn AuditStore>, invites: InviteList, ttl_days: u64) -> Self {
        Self {
            store,
            invites,
            ttl_secs: ttl_days * 24 * 60 * 60,
        }
    }

    /// Select the store backend from config. Missing Upstash credentials are
    /// not an error; records just stay in process memory.
    pub fn from_config(cfg: &AppConfig) -> Self {
        let store: Arc<dyn AuditStore> = match (&cfg.audit.upstash_url, &cfg.audit.upstash_token) {
            (Some(url), Some(token)) => Arc::new(UpstashStore::new(url, token)),
            _ => {
                tracing::warn!("audit store not configured; keeping audit records in memory");
                Arc::new(MemoryStore::default())
            }
        };
        Self::new(store, cfg.gate.invites.clone(), cfg.audit.ttl_days)
    }

    /// Resolve the identity, append the record to today's bucket and refresh
    /// the bucket's TTL.
    pub async fn record(&self, token_or_name: &str, event: &AuditEvent) -> Result<(), StoreError> {
        let now = Utc::now();
        let record = AuditRecord {
            ts: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            who: self.invites.resolve_name(token_or_name),
            event,
        };

        let key = bucket_key(&now);
        let line = serde_json::to_string(&record)?;
        self.store.rpush(&key, line).await?;
        self.store.expire(&key, self.ttl_secs).await?;
        Ok(())
    }

    /// Fire-and-forget entry point for request handlers: the write runs on
    /// its own task and any failure is logged and swallowed. The handle is
    /// returned so tests can await the task; callers drop it.
    pub fn dispatch(
        &'static self,
        token_or_name: String,
        event: AuditEvent,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.record(&token_or_name, &event).await {
                tracing::warn!(event = event.kind(), error = %e, "audit write failed; dropping record");
            }
        })
    }
}

static SINK: Lazy<AuditSink> = Lazy::new(|| AuditSink::from_config(config::config()));

pub fn sink() -> &'static AuditSink {
    &SINK
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;

    /// Store whose appends always fail, for exercising the swallow path.
    struct BrokenStore;

    #[async_trait]
    impl AuditStore for BrokenStore {
        async fn rpush(&self, _key: &str, _value: String) -> Result<(), StoreError> {
            Err(StoreError::Command("WRONGTYPE simulated failure".to_string()))
        }

        async fn expire(&self, _key: &str, _ttl_secs: u64) -> Result<(), StoreError> {
            Err(StoreError::Command("WRONGTYPE simulated failure".to_string()))
        }
    }

    fn test_sink() -> (Arc<MemoryStore>, AuditSink) {
        let store = Arc::new(MemoryStore::default());
        let invites = InviteList::parse("alice=ABC123,bob=XYZ789");
        let sink = AuditSink::new(store.clone(), invites, 14);
        (store, sink)
    }

    #[test]
    fn bucket_key_is_utc_calendar_day() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 25, 23, 59, 59).unwrap();
        assert_eq!(bucket_key(&ts), "audit:2026-08-25");
    }

    #[test]
    fn from_parts_decodes_known_events() {
        let data = serde_json::json!({ "length": 42 });
        assert_eq!(
            AuditEvent::from_parts(Some("message_sent"), Some(&data)),
            AuditEvent::MessageSent { length: 42 }
        );
        let data = serde_json::json!({ "message": "boom" });
        assert_eq!(
            AuditEvent::from_parts(Some("error"), Some(&data)),
            AuditEvent::Error { message: Some("boom".to_string()) }
        );
    }

    #[test]
    fn from_parts_defaults_malformed_input_to_visit() {
        assert_eq!(AuditEvent::from_parts(None, None), AuditEvent::Visit);
        assert_eq!(AuditEvent::from_parts(Some("made_up"), None), AuditEvent::Visit);
        // Missing fields get defaults rather than rejection
        assert_eq!(
            AuditEvent::from_parts(Some("message_sent"), None),
            AuditEvent::MessageSent { length: 0 }
        );
    }

    #[tokio::test]
    async fn record_resolves_name_and_flattens_payload() {
        let (store, sink) = test_sink();
        let event = AuditEvent::MessageSent { length: 42 };
        sink.record("ABC123", &event).await.unwrap();

        let key = bucket_key(&Utc::now());
        let entries = store.list(&key);
        assert_eq!(entries.len(), 1);

        let record: Value = serde_json::from_str(&entries[0]).unwrap();
        assert_eq!(record["who"], "alice");
        assert_eq!(record["event"], "message_sent");
        assert_eq!(record["length"], 42);
        assert!(record["ts"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn unmatched_token_is_stored_verbatim() {
        let (store, sink) = test_sink();
        sink.record("unknown", &AuditEvent::Visit).await.unwrap();

        let entries = store.list(&bucket_key(&Utc::now()));
        let record: Value = serde_json::from_str(&entries[0]).unwrap();
        assert_eq!(record["who"], "unknown");
        assert_eq!(record["event"], "visit");
        // visit carries no payload fields
        assert!(record.get("length").is_none());
    }

    #[tokio::test]
    async fn ttl_refreshed_on_every_write() {
        let (store, sink) = test_sink();
        let key = bucket_key(&Utc::now());

        sink.record("ABC123", &AuditEvent::Visit).await.unwrap();
        assert_eq!(store.ttl(&key), Some(14 * 24 * 60 * 60));

        sink.record("XYZ789", &AuditEvent::Visit).await.unwrap();
        assert_eq!(store.list(&key).len(), 2);
        assert_eq!(store.ttl(&key), Some(14 * 24 * 60 * 60));
    }

    #[tokio::test]
    async fn record_surfaces_store_failure() {
        let invites = InviteList::parse("alice=ABC123");
        let sink = AuditSink::new(Arc::new(BrokenStore), invites, 14);

        let result = sink.record("ABC123", &AuditEvent::Visit).await;
        assert!(matches!(result, Err(StoreError::Command(_))));
    }

    #[tokio::test]
    async fn dispatch_drops_failed_writes_without_panicking() {
        let invites = InviteList::parse("alice=ABC123");
        let sink: &'static AuditSink =
            Box::leak(Box::new(AuditSink::new(Arc::new(BrokenStore), invites, 14)));

        let handle = sink.dispatch("ABC123".to_string(), AuditEvent::MessageSent { length: 42 });

        // The task must swallow the store error rather than unwind.
        handle.await.expect("audit task must not panic");
    }

    #[test]
    fn session_created_omits_absent_expiry() {
        let event = AuditEvent::SessionCreated { expires_after: None };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "session_created" }));
    }
}
