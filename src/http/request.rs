//! Request extraction.
//!
//! # Responsibilities
//! - Decode query and form-body pairs into the nested args mapping
//! - Read the session id from the session cookie
//! - Carry the request id assigned by the request-id layer
//!
//! # Design Decisions
//! - Query pairs are applied first, form pairs second (form wins on conflict)
//! - Non-form bodies are ignored; malformed pairs never fail the request

use axum::http::{header, HeaderMap};

use crate::config::value::Map;
use crate::request::args;

pub const X_REQUEST_ID: &str = "x-request-id";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Args from the query string and, for form posts, the body.
pub fn request_args(query: Option<&str>, headers: &HeaderMap, body: &[u8]) -> Map {
    let mut out = query.map(args::parse_query).unwrap_or_default();
    if is_form(headers) && !body.is_empty() {
        args::merge_query(&mut out, &String::from_utf8_lossy(body));
    }
    out
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// The value of cookie `name`, if sent.
pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok())
}

pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    use crate::config::value::Value;

    #[test]
    fn test_form_body_overrides_query() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
        );
        let args = request_args(Some("a=1&b=2"), &headers, b"b=3&blog[title]=Hi");
        assert_eq!(args.get("a"), Some(&Value::from("1")));
        assert_eq!(args.get("b"), Some(&Value::from("3")));
        assert_eq!(
            args.get("blog").and_then(|b| b.get_path("title")),
            Some(&Value::from("Hi"))
        );
    }

    #[test]
    fn test_non_form_body_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let args = request_args(None, &headers, br#"{"a":1}"#);
        assert!(args.is_empty());
    }

    #[test]
    fn test_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; elation_sid=abc123"));
        assert_eq!(cookie(&headers, "elation_sid").as_deref(), Some("abc123"));
        assert_eq!(cookie(&headers, "missing"), None);
    }
}
