use axum::body::Body;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::Response;
use http::header::{CONTENT_TYPE, SET_COOKIE};
use serde_json::{Map, Value, json};

use super::event::EventShape;
use crate::errors::ShimError;

const TEXT_MIME_TYPES: &[&str] = &[
    "application/json",
    "application/javascript",
    "application/xml",
    "application/vnd.api+json",
    "image/svg+xml",
];

/// Whether a body with this `Content-Type` is returned as plain text rather
/// than base64.
#[must_use]
pub fn is_text_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/") || mime.ends_with("+json") || TEXT_MIME_TYPES.contains(&mime.as_str())
}

/// Serializes an application response into the platform's response shape.
///
/// `Set-Cookie` is returned as `cookies` for v2 events and through
/// `multiValueHeaders` for v1 events; other repeated headers are joined with
/// `", "`.
pub async fn to_event_response(
    response: Response<Body>,
    shape: EventShape,
) -> Result<Value, ShimError> {
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| ShimError::EventError(format!("failed to read response body: {e}")))?;

    let mut headers = Map::new();
    let mut cookies = Vec::new();
    for name in parts.headers.keys() {
        let values: Vec<String> = parts
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok().map(ToString::to_string))
            .collect();

        if name == SET_COOKIE {
            cookies.extend(values);
        } else {
            headers.insert(name.as_str().to_string(), Value::String(values.join(", ")));
        }
    }

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/plain");

    let (body, is_base64) = if bytes.is_empty() {
        (String::new(), false)
    } else if is_text_content_type(content_type) {
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => (text, false),
            Err(_) => (BASE64.encode(&bytes), true),
        }
    } else {
        (BASE64.encode(&bytes), true)
    };

    let mut out = json!({
        "statusCode": parts.status.as_u16(),
        "headers": headers,
        "body": body,
        "isBase64Encoded": is_base64,
    });

    if !cookies.is_empty() {
        match shape {
            EventShape::HttpApiV2 => {
                out["cookies"] = json!(cookies);
            }
            EventShape::RestApiV1 => {
                out["multiValueHeaders"] = json!({ "set-cookie": cookies });
            }
            EventShape::Plain => {
                out["headers"]["set-cookie"] = Value::String(cookies.join(", "));
            }
        }
    }

    Ok(out)
}
