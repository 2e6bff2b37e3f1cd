//! Response writing.
//!
//! # Responsibilities
//! - Turn a component [`Response`] into an HTTP response
//! - Pick the content type from the response type
//! - Emit redirects as `302 Found` with `Location`
//!
//! # Design Decisions
//! - Structured content is encoded as JSON for every response type
//! - Rendered text in ajax and jsonp responses goes out as `{"content": "<text>"}`
//! - JSONP wraps the body only when a callback name is given and is a plain identifier

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};
use serde::Serialize;

use crate::component::response::{Content, Response, ResponseType};

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const JSONP_CONTENT_TYPE: &str = "application/javascript";

pub fn content_type(response_type: ResponseType) -> &'static str {
    match response_type {
        ResponseType::Html => HTML_CONTENT_TYPE,
        ResponseType::Ajax | ResponseType::Json => JSON_CONTENT_TYPE,
        ResponseType::Jsonp => JSONP_CONTENT_TYPE,
    }
}

/// Encode a component response. `callback` is the JSONP function name, if any.
pub fn into_http(response: Response, callback: Option<&str>) -> HttpResponse {
    if let Some(location) = response.redirect.as_deref() {
        return match HeaderValue::from_str(location) {
            Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
            Err(_) => {
                tracing::warn!(location = %location, "Dropping redirect with invalid location");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
    }

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match (response.response_type, response.content) {
        (_, Content::Data(value)) => encode_json(&value),
        (ResponseType::Ajax | ResponseType::Jsonp, Content::Text(text)) => {
            encode_json(&serde_json::json!({ "content": text }))
        }
        (_, Content::Text(text)) => text,
    };
    let body = match (response.response_type, callback.filter(|c| is_callback_name(c))) {
        (ResponseType::Jsonp, Some(callback)) => format!("{callback}({body})"),
        _ => body,
    };

    (
        status,
        [(header::CONTENT_TYPE, content_type(response.response_type))],
        Body::from(body),
    )
        .into_response()
}

fn encode_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode response data");
        String::from("null")
    })
}

fn is_callback_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
}
