// handlers/session.rs - POST /api/create-session handler
//
// Thin proxy to the remote ChatKit session API. The widget needs a session
// secret that only the server-held API key can mint; nothing about the
// session itself is stored here.

use axum::{http::HeaderMap, response::Json};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::audit::{self, AuditEvent};
use crate::config;
use crate::error::ApiError;
use crate::handlers::identity_from_headers;

// Shared client so session calls reuse one connection pool.
static CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// POST /api/create-session - obtain a widget session secret
///
/// Forwards to the remote session API once (no retries), audits
/// `session_created` on success and maps any failure to a 502 that the
/// client renders as an inline error while withholding the widget.
pub async fn create_session_post(
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    let cfg = config::config();
    let who = identity_from_headers(&headers);

    let Some(api_key) = cfg.chatkit.api_key.as_deref() else {
        tracing::error!("OPENAI_API_KEY not configured; cannot create chat sessions");
        return Err(ApiError::internal_server_error("Chat session is not available"));
    };

    // Pass the client's widget configuration through when present.
    let chatkit_configuration = body
        .as_ref()
        .and_then(|Json(b)| b.get("chatkit_configuration").cloned())
        .unwrap_or_else(|| json!({ "file_upload": { "enabled": true } }));

    let payload = json!({
        "workflow": { "id": cfg.chatkit.workflow_id },
        "user": who.as_str(),
        "chatkit_configuration": chatkit_configuration,
    });

    let response = CLIENT
        .post(format!("{}/v1/chatkit/sessions", cfg.chatkit.api_base))
        .bearer_auth(api_key)
        .header("OpenAI-Beta", "chatkit_beta=v1")
        .json(&payload)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "session API unreachable");
            let _ = audit::sink().dispatch(
                who.clone(),
                AuditEvent::Error { message: Some("session API unreachable".to_string()) },
            );
            ApiError::bad_gateway("Chat session could not be created")
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        tracing::error!(%status, detail = %detail, "session API rejected request");
        let _ = audit::sink().dispatch(
            who,
            AuditEvent::Error { message: Some(format!("create session failed: {}", status)) },
        );
        return Err(ApiError::bad_gateway("Chat session could not be created"));
    }

    let session: Value = response.json().await.map_err(|e| {
        tracing::error!(error = %e, "session API returned malformed body");
        ApiError::bad_gateway("Chat session could not be created")
    })?;

    let client_secret = session.get("client_secret").cloned().unwrap_or(Value::Null);
    let expires_after = session.get("expires_after").cloned().unwrap_or(Value::Null);

    let _ = audit::sink().dispatch(
        who,
        AuditEvent::SessionCreated {
            expires_after: expires_after.as_str().map(String::from),
        },
    );

    Ok(Json(json!({
        "client_secret": client_secret,
        "expires_after": expires_after,
    })))
}
