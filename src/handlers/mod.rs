pub mod audit;
pub mod health;
pub mod pages;
pub mod session;

use axum::http::{header, HeaderMap};

use crate::middleware::{cookie_value, SESSION_COOKIE_NAME};

/// Identity token for audit purposes, taken from the session cookie.
/// Requests without a cookie audit as "unknown" rather than being rejected.
pub(crate) fn identity_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, SESSION_COOKIE_NAME))
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn identity_defaults_to_unknown() {
        let headers = HeaderMap::new();
        assert_eq!(identity_from_headers(&headers), "unknown");
    }

    #[test]
    fn identity_read_from_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; fm_invite=ABC123"),
        );
        assert_eq!(identity_from_headers(&headers), "ABC123");
    }
}
