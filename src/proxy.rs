//! Backend proxy function.
//!
//! Forwards `/api/<path>` to `<BACKEND_URL>/api/<path>` with the caller's
//! method, headers and body, and relays the backend's status, headers and
//! body. Served through the same [`Adapter`](crate::adapter::Adapter) as the
//! API function.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use serde_json::json;
use tracing::{error, info};

use crate::errors::ShimError;

pub const UNAVAILABLE_MESSAGE: &str = "Backend service unavailable";

fn is_forwarded_method(method: &Method) -> bool {
    [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ]
    .contains(method)
}

/// Hop-by-hop and framing headers the runtime recomputes on each leg.
fn framing_headers() -> [header::HeaderName; 3] {
    [
        header::CONTENT_LENGTH,
        header::CONNECTION,
        header::TRANSFER_ENCODING,
    ]
}

#[derive(Debug, Clone)]
pub struct BackendProxy {
    client: reqwest::Client,
    backend_url: String,
}

impl BackendProxy {
    pub fn new(backend_url: &str) -> Result<Self, ShimError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(25))
            .build()?;
        Ok(Self {
            client,
            backend_url: backend_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self, path: &str, query: Option<&str>) -> String {
        let path = path.trim_start_matches('/');
        match query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{}/api/{path}?{q}", self.backend_url),
            None => format!("{}/api/{path}", self.backend_url),
        }
    }

    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, ShimError> {
        let url = self.endpoint(path, query);
        info!(method = %method, url = %url, "Forwarding request to backend");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .headers(forwardable_headers(headers));
        if method != Method::GET && method != Method::DELETE {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let mut relayed = response.headers().clone();
        for name in framing_headers() {
            relayed.remove(name);
        }
        let body = response.bytes().await?;

        Ok((status, relayed, body).into_response())
    }
}

#[must_use]
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    forwarded.remove(header::HOST);
    for name in framing_headers() {
        forwarded.remove(name);
    }
    forwarded
}

pub fn router(proxy: BackendProxy) -> Router {
    Router::new()
        .route("/api/{*path}", any(forward))
        .with_state(Arc::new(proxy))
}

async fn forward(
    State(proxy): State<Arc<BackendProxy>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_forwarded_method(&method) {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    match proxy
        .forward(method, &path, query.as_deref(), &headers, body)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!("Proxy error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({ "error": UNAVAILABLE_MESSAGE })),
            )
                .into_response()
        }
    }
}
