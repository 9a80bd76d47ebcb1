//! Invocation event → `http::Request` translation.
//!
//! Three payload shapes are understood:
//! - API Gateway HTTP API (payload v2): `version: "2.0"`, `requestContext.http`,
//!   `rawPath`, `rawQueryString`, `cookies`
//! - API Gateway REST API (payload v1): `httpMethod`, `path`,
//!   `(multiValue)queryStringParameters`, `(multiValue)headers`
//! - plain platform events: `method`, `path` (may carry a query), `headers`

use axum::body::Body;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::header::{COOKIE, HeaderName, HeaderValue};
use http::{Method, Request};
use serde_json::{Map, Value};

use crate::errors::ShimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventShape {
    HttpApiV2,
    RestApiV1,
    Plain,
}

impl EventShape {
    #[must_use]
    pub fn detect(event: &Value) -> Self {
        if v_str(event, &["version"]) == Some("2.0")
            || v_path(event, &["requestContext", "http"]).is_some()
        {
            EventShape::HttpApiV2
        } else if event.get("httpMethod").is_some() {
            EventShape::RestApiV1
        } else {
            EventShape::Plain
        }
    }
}

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(|v| v.as_str())
}

/// Builds the request the application will see. `base_path` is stripped
/// from the front of the event path (`/` strips nothing).
pub fn to_request(event: &Value, base_path: &str) -> Result<Request<Body>, ShimError> {
    let shape = EventShape::detect(event);

    let method_str = match shape {
        EventShape::HttpApiV2 => v_str(event, &["requestContext", "http", "method"]),
        EventShape::RestApiV1 => v_str(event, &["httpMethod"]),
        EventShape::Plain => v_str(event, &["method"]),
    }
    .ok_or_else(|| ShimError::EventError("missing HTTP method".to_string()))?;
    let method = Method::from_bytes(method_str.to_ascii_uppercase().as_bytes())
        .map_err(|e| ShimError::EventError(format!("invalid HTTP method {method_str:?}: {e}")))?;

    let raw_path = match shape {
        EventShape::HttpApiV2 => v_str(event, &["rawPath"])
            .or_else(|| v_str(event, &["requestContext", "http", "path"])),
        EventShape::RestApiV1 | EventShape::Plain => v_str(event, &["path"]),
    }
    .ok_or_else(|| ShimError::EventError("missing request path".to_string()))?;

    let (raw_path, inline_query) = match raw_path.split_once('?') {
        Some((p, q)) => (p, Some(q.to_string())),
        None => (raw_path, None),
    };
    let path = strip_base_path(raw_path, base_path);
    let query = match shape {
        EventShape::HttpApiV2 => v_str(event, &["rawQueryString"]).map(ToString::to_string),
        EventShape::RestApiV1 => rest_query_string(event),
        EventShape::Plain => None,
    }
    .or(inline_query)
    .filter(|q| !q.is_empty());

    let uri = match query {
        Some(q) => format!("{path}?{q}"),
        None => path,
    };

    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in event_headers(event) {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ShimError::EventError(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| ShimError::EventError(format!("invalid value for header {name}: {e}")))?;
            headers.append(name, value);
        }

        if let Some(cookies) = event.get("cookies").and_then(Value::as_array) {
            let joined = cookies
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ");
            if !joined.is_empty() && !headers.contains_key(COOKIE) {
                let value = HeaderValue::from_str(&joined)
                    .map_err(|e| ShimError::EventError(format!("invalid cookies: {e}")))?;
                headers.insert(COOKIE, value);
            }
        }
    }

    Ok(builder.body(Body::from(event_body(event)?))?)
}

fn strip_base_path(path: &str, base_path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    let stripped = if base.is_empty() {
        path
    } else {
        match path.strip_prefix(base) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path,
        }
    };

    if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    }
}

fn rest_query_string(event: &Value) -> Option<String> {
    let encode = |k: &str, v: &str| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v));

    if let Some(multi) = event
        .get("multiValueQueryStringParameters")
        .and_then(Value::as_object)
    {
        let pairs: Vec<String> = multi
            .iter()
            .flat_map(|(k, values)| {
                values
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str)
                    .map(move |v| encode(k.as_str(), v))
            })
            .collect();
        return Some(pairs.join("&"));
    }

    event
        .get("queryStringParameters")
        .and_then(Value::as_object)
        .map(|single| {
            single
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| encode(k.as_str(), v)))
                .collect::<Vec<_>>()
                .join("&")
        })
}

/// `multiValueHeaders` wins over `headers` when both are present.
fn event_headers(event: &Value) -> Vec<(String, String)> {
    if let Some(multi) = event.get("multiValueHeaders").and_then(Value::as_object) {
        return multi
            .iter()
            .flat_map(|(k, values)| {
                values
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str)
                    .map(move |v| (k.clone(), v.to_string()))
            })
            .collect();
    }

    event
        .get("headers")
        .and_then(Value::as_object)
        .map(single_headers)
        .unwrap_or_default()
}

fn single_headers(map: &Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
        .collect()
}

fn event_body(event: &Value) -> Result<Vec<u8>, ShimError> {
    let Some(body) = event.get("body").and_then(Value::as_str) else {
        return Ok(Vec::new());
    };

    let encoded = event
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false)
        || v_str(event, &["encoding"]) == Some("base64");

    if encoded {
        BASE64
            .decode(body)
            .map_err(|e| ShimError::EventError(format!("invalid base64 body: {e}")))
    } else {
        Ok(body.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_path_is_stripped_only_on_segment_boundary() {
        assert_eq!(strip_base_path("/api/tasks", "/api"), "/tasks");
        assert_eq!(strip_base_path("/api", "/api/"), "/");
        assert_eq!(strip_base_path("/apiary", "/api"), "/apiary");
        assert_eq!(strip_base_path("/tasks", "/"), "/tasks");
    }

    #[test]
    fn rest_query_prefers_multi_value_parameters() {
        let event = json!({
            "queryStringParameters": {"tag": "b"},
            "multiValueQueryStringParameters": {"tag": ["a", "b"]}
        });
        assert_eq!(rest_query_string(&event).as_deref(), Some("tag=a&tag=b"));
    }

    #[test]
    fn rest_query_encodes_values() {
        let event = json!({"queryStringParameters": {"q": "a b&c"}});
        assert_eq!(rest_query_string(&event).as_deref(), Some("q=a%20b%26c"));
    }

    #[test]
    fn detects_shapes() {
        assert_eq!(
            EventShape::detect(&json!({"version": "2.0", "rawPath": "/"})),
            EventShape::HttpApiV2
        );
        assert_eq!(
            EventShape::detect(&json!({"httpMethod": "GET", "path": "/"})),
            EventShape::RestApiV1
        );
        assert_eq!(
            EventShape::detect(&json!({"method": "GET", "path": "/"})),
            EventShape::Plain
        );
    }
}
