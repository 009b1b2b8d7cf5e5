// handlers/audit.rs - POST /api/audit handler

use axum::{http::HeaderMap, response::Json};
use serde_json::{json, Value};

use crate::audit::{self, AuditEvent};
use crate::handlers::identity_from_headers;

/// POST /api/audit - record a client-reported audit event
///
/// Always answers `{"ok": true}`: the audit pipeline is best-effort and must
/// never block or break the chat flow, so malformed bodies fall back to
/// defaults and storage failures are swallowed by the sink.
pub async fn audit_post(headers: HeaderMap, body: Option<Json<Value>>) -> Json<Value> {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);

    let event = AuditEvent::from_parts(
        body.get("event").and_then(Value::as_str),
        body.get("data"),
    );
    let who = identity_from_headers(&headers);

    let _ = audit::sink().dispatch(who, event);

    Json(json!({ "ok": true }))
}
