// handlers/pages.rs - GET / and GET /login
//
// Plain server-rendered HTML. The chat page's inline script drives the
// client-side flow: report the visit, obtain a session secret, mount the
// hosted widget, and report message/error events - all fire-and-forget.

use axum::response::Html;

use crate::config;

/// GET / - chat page (behind the access gate)
pub async fn chat_page() -> Html<String> {
    let cfg = config::config();
    Html(chat_page_template(
        &cfg.chatkit.public_key,
        &cfg.chatkit.workflow_id,
    ))
}

/// GET /login - static informational page for visitors without a valid link
pub async fn login_page() -> Html<String> {
    Html(LOGIN_PAGE.to_string())
}

fn chat_page_template(public_key: &str, workflow_id: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="de">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>FM Leadership Coach (Beta)</title>
  <style>
    body {{ font-family: system-ui, sans-serif; max-width: 48rem; margin: 0 auto; padding: 1.5rem; }}
    header p {{ opacity: 0.7; font-size: 0.875rem; }}
    #error {{ display: none; border: 1px solid #fca5a5; background: #fef2f2; color: #b91c1c;
              border-radius: 0.75rem; padding: 1rem; margin-bottom: 1rem; }}
    #status {{ border: 1px solid #e5e7eb; border-radius: 0.75rem; padding: 1.5rem; font-size: 0.875rem; }}
    #chat {{ display: none; }}
  </style>
  <script src="https://cdn.platform.openai.com/deployments/chatkit/chatkit.js" async></script>
</head>
<body>
  <header>
    <h1>FM Leadership Coach (Beta)</h1>
    <p>Testversion &ndash; keine personenbezogenen Daten eingeben. Antworten k&ouml;nnen zu Trainingszwecken geloggt werden.</p>
  </header>

  <div id="error"><strong>Fehler beim Initialisieren</strong><div id="error-detail"></div></div>
  <div id="status">Initialisiere Sitzung&hellip;</div>
  <div id="chat"><openai-chatkit id="widget"></openai-chatkit></div>

  <script>
    const PUBLIC_KEY = "{public_key}";
    const WORKFLOW_ID = "{workflow_id}";

    // Fire-and-forget: audit reporting must never block the chat flow.
    function audit(event, data) {{
      fetch("/api/audit", {{
        method: "POST",
        headers: {{ "Content-Type": "application/json" }},
        body: JSON.stringify({{ event: event, data: data }}),
      }}).catch(function () {{}});
    }}

    function showError(message) {{
      document.getElementById("status").style.display = "none";
      document.getElementById("error-detail").textContent = message;
      document.getElementById("error").style.display = "block";
    }}

    async function createSession() {{
      const res = await fetch("/api/create-session", {{
        method: "POST",
        headers: {{ "Content-Type": "application/json" }},
        body: JSON.stringify({{ chatkit_configuration: {{ file_upload: {{ enabled: true }} }} }}),
      }});
      if (!res.ok) throw new Error("Create session failed: " + res.status);
      return res.json();
    }}

    function mountWidget(clientSecret) {{
      const widget = document.getElementById("widget");
      widget.setOptions({{
        publicKey: PUBLIC_KEY,
        clientSecret: clientSecret,
        workflowId: WORKFLOW_ID,
      }});
      // Message length only - content never reaches the audit log.
      widget.addEventListener("chatkit.message.sent", function (e) {{
        const text = (e.detail && e.detail.text) || "";
        audit("message_sent", {{ length: text.length }});
      }});
      widget.addEventListener("chatkit.error", function (e) {{
        audit("error", {{ message: String(e.detail && e.detail.error) }});
      }});
      document.getElementById("status").style.display = "none";
      document.getElementById("chat").style.display = "block";
    }}

    window.addEventListener("DOMContentLoaded", async function () {{
      audit("visit");
      if (!PUBLIC_KEY || !WORKFLOW_ID) {{
        showError("Konfiguration unvollständig.");
        return;
      }}
      try {{
        const data = await createSession();
        if (!data.client_secret) throw new Error("No client_secret from /api/create-session");
        mountWidget(data.client_secret);
      }} catch (e) {{
        showError(e && e.message ? e.message : "Unknown error");
        audit("error", {{ message: String(e) }});
      }}
    }});
  </script>
</body>
</html>"##
    )
}

const LOGIN_PAGE: &str = r##"<!DOCTYPE html>
<html lang="de">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Invite-Only Zugang</title>
  <style>
    body { font-family: system-ui, sans-serif; max-width: 48rem; margin: 0 auto; padding: 1.5rem; }
  </style>
</head>
<body>
  <h1>Invite-Only Zugang</h1>
  <p>Bitte nutze deinen pers&ouml;nlichen Testlink mit Token (Parameter <code>?t=&hellip;</code>).</p>
  <p>Falls du keinen Link hast, wende dich an den Projektverantwortlichen.</p>
</body>
</html>"##;
