//! Stand-in application bound when the primary application fails to
//! initialize, so the function still answers with the failure detail.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

pub fn router(message: &str) -> Router {
    let body = json!({ "status": "error", "message": message });
    Router::new().route("/", get(move || health_check(body.clone())))
}

async fn health_check(body: Value) -> Json<Value> {
    Json(body)
}
