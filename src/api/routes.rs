//! The primary application: service banner and database health check.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::warn;

use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Todo API is running" }))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let outcome = state
        .db
        .scoped(|mut session| async move { session.ping().await })
        .await
        .and_then(|ping| ping);

    match outcome {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "persistent": state.db.kind().is_persistent(),
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": e.to_string() })),
            )
        }
    }
}
