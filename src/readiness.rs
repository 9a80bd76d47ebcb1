//! Deployment readiness check.
//!
//! Initializes the handler exactly like the function entry point, sends a
//! synthetic `GET` for every expected route and reports what came back.

use serde::Serialize;
use serde_json::{Value, json};

use crate::handler::Handler;

pub const EXPECTED_ROUTES: &[&str] = &["/", "/health"];

#[derive(Debug, Clone, Serialize)]
pub struct RouteCheck {
    pub path: String,
    pub status: u16,
    pub body: String,
}

impl RouteCheck {
    #[must_use]
    pub fn passed(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub initialization_error: Option<String>,
    pub routes: Vec<RouteCheck>,
}

impl ReadinessReport {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.initialization_error.is_none() && self.routes.iter().all(RouteCheck::passed)
    }
}

/// Minimal HTTP API (v2) event for `method path`.
#[must_use]
pub fn synthetic_event(method: &str, path: &str) -> Value {
    json!({
        "version": "2.0",
        "rawPath": path,
        "rawQueryString": "",
        "headers": { "accept": "application/json", "user-agent": "todo-readiness" },
        "requestContext": { "http": { "method": method, "path": path } },
        "isBase64Encoded": false
    })
}

pub async fn check(handler: &Handler) -> ReadinessReport {
    let mut routes = Vec::with_capacity(EXPECTED_ROUTES.len());
    for path in EXPECTED_ROUTES {
        let response = handler.dispatch(&synthetic_event("GET", path)).await;
        routes.push(RouteCheck {
            path: (*path).to_string(),
            status: response
                .get("statusCode")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or(0),
            body: response
                .get("body")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    ReadinessReport {
        initialization_error: handler.failure().map(ToString::to_string),
        routes,
    }
}
