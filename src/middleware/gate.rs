//! Access gate middleware.
//!
//! Every request passes through here except a small exclusion set (assets,
//! the API namespace, the login page). Two variants exist behind one config
//! switch: the invite-token gate (URL token exchanged for a session cookie)
//! and a basic-auth gate. Unknown or missing credentials redirect to /login.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use base64::Engine;

use crate::config::{self, GateMode};
use crate::invites::InviteList;

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "fm_invite";

/// 30-day session cookie lifetime
const COOKIE_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Decision produced by the token gate for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Valid `?t=` token: redirect to the query-stripped path and attach the
    /// session cookie. This both authenticates and cleans the visible URL.
    Grant { token: String, location: String },
    /// Excluded path or valid session cookie: pass through unmodified.
    Allow,
    /// No valid credential: redirect to the login page.
    Deny,
}

/// Paths the gate never touches. The router-level matcher is expected to
/// skip these as well; this is the internal re-check against a
/// misconfigured matcher.
pub fn is_excluded(path: &str) -> bool {
    path == "/login"
        || path == "/favicon.ico"
        || path == "/robots.txt"
        || path == "/sitemap.xml"
        || path == "/health"
        || path.starts_with("/api/")
        || path.starts_with("/assets/")
        || path.starts_with("/.well-known/")
}

/// Pure gate decision for the token variant.
///
/// Matching is exact string equality against the allowlist. An empty
/// allowlist fails closed: every non-excluded request is denied.
pub fn evaluate(
    invites: &InviteList,
    path: &str,
    query: Option<&str>,
    cookie_header: Option<&str>,
) -> GateOutcome {
    if is_excluded(path) {
        return GateOutcome::Allow;
    }

    // 1. Token-in-URL grant: strip the query string from the redirect target.
    if let Some(token) = query.and_then(|q| query_param(q, "t")) {
        if invites.contains_token(token) {
            return GateOutcome::Grant {
                token: token.to_string(),
                location: path.to_string(),
            };
        }
    }

    // 2. Cookie pass-through.
    if let Some(cookie) = cookie_header.and_then(|c| cookie_value(c, SESSION_COOKIE_NAME)) {
        if invites.contains_token(cookie) {
            return GateOutcome::Allow;
        }
    }

    // 3. Denial.
    GateOutcome::Deny
}

/// Extract a raw query parameter value. Invite tokens are plain strings by
/// configuration convention, so no percent-decoding is applied.
fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// Extract a cookie value from a `Cookie:` header string.
pub fn cookie_value<'a>(cookies: &'a str, name: &str) -> Option<&'a str> {
    cookies
        .split(';')
        .map(|c| c.trim())
        .filter_map(|c| c.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// Build the `Set-Cookie` value for a granted session.
fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE_NAME, token, COOKIE_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Gate middleware applied to the whole router.
pub async fn gate_middleware(request: Request, next: Next) -> Response {
    let cfg = config::config();

    match cfg.gate.mode {
        GateMode::Token => token_gate(request, next).await,
        GateMode::Basic => basic_gate(request, next).await,
    }
}

async fn token_gate(request: Request, next: Next) -> Response {
    let cfg = config::config();

    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let cookie_header = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match evaluate(
        &cfg.gate.invites,
        &path,
        query.as_deref(),
        cookie_header.as_deref(),
    ) {
        GateOutcome::Allow => next.run(request).await,
        GateOutcome::Grant { token, location } => {
            tracing::info!(who = cfg.gate.invites.resolve_name(&token), "invite token accepted");
            let cookie = session_cookie(&token, cfg.secure_cookies());
            (
                [(header::SET_COOKIE, cookie)],
                Redirect::temporary(&location),
            )
                .into_response()
        }
        GateOutcome::Deny => Redirect::temporary("/login").into_response(),
    }
}

async fn basic_gate(request: Request, next: Next) -> Response {
    let cfg = config::config();

    if is_excluded(request.uri().path()) {
        return next.run(request).await;
    }

    // Both credentials unset means the gate is deliberately disabled.
    let (user, pass) = match (&cfg.gate.basic_auth_user, &cfg.gate.basic_auth_pass) {
        (Some(u), Some(p)) => (u.as_str(), p.as_str()),
        _ => return next.run(request).await,
    };

    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if check_basic_auth(authorization, user, pass) {
        return next.run(request).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, r#"Basic realm="FM-Coach Test""#)],
        "Auth required",
    )
        .into_response()
}

/// Validate an `Authorization: Basic` header against configured credentials.
fn check_basic_auth(header: Option<&str>, user: &str, pass: &str) -> bool {
    let Some(b64) = header.and_then(|h| h.strip_prefix("Basic ")) else {
        return false;
    };
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(b64) else {
        return false;
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return false;
    };
    match credentials.split_once(':') {
        Some((u, p)) => u == user && p == pass,
        None => false,
    }
}
