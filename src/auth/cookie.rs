use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue};

pub const SESSION_COOKIE: &str = "jwt";

/// `Set-Cookie` value carrying the session token.
pub fn session_cookie(token: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Strict",
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires the session cookie immediately.
pub fn cleared_cookie(secure: bool) -> String {
    session_cookie("", Duration::ZERO, secure)
}

pub fn set_cookie_headers(cookie: &str) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, HeaderValue::from_str(cookie)?);
    Ok(headers)
}

/// Reads a cookie by name from every `Cookie` header on the request.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_has_hardening_flags() {
        let c = session_cookie("abc", Duration::from_secs(7 * 24 * 60 * 60), false);
        assert!(c.starts_with("jwt=abc;"));
        assert!(c.contains("HttpOnly"));
        assert!(c.contains("SameSite=Strict"));
        assert!(c.contains("Max-Age=604800"));
        assert!(!c.contains("Secure"));
    }

    #[test]
    fn secure_flag_only_when_requested() {
        assert!(session_cookie("abc", Duration::from_secs(1), true).ends_with("; Secure"));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let c = cleared_cookie(false);
        assert!(c.starts_with("jwt=;"));
        assert!(c.contains("Max-Age=0"));
    }

    #[test]
    fn read_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=night; jwt=tok.en.x"));
        assert_eq!(read_cookie(&headers, "jwt"), Some("tok.en.x"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn read_cookie_treats_empty_value_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("jwt="));
        assert_eq!(read_cookie(&headers, "jwt"), None);
    }
}
