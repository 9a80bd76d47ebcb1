//! Serverless adapter: drives an `axum::Router` with one invocation event at
//! a time and returns the platform's HTTP-shaped response.

pub mod event;
pub mod lifespan;
pub mod response;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::Router;
use futures::FutureExt;
use serde_json::Value;
use tokio::sync::OnceCell;
use tower::ServiceExt;
use tracing::{error, info, warn};

pub use event::EventShape;
pub use lifespan::{Lifespan, StartupHook};

use crate::api::helpers;

pub struct Adapter {
    router: Router,
    lifespan: Lifespan,
    base_path: String,
    startup_hooks: Vec<Arc<dyn StartupHook>>,
    started: OnceCell<()>,
}

impl Adapter {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            router,
            lifespan: Lifespan::default(),
            base_path: "/".to_string(),
            startup_hooks: Vec::new(),
            started: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn lifespan(mut self, lifespan: Lifespan) -> Self {
        self.lifespan = lifespan;
        self
    }

    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    #[must_use]
    pub fn on_startup(mut self, hook: Arc<dyn StartupHook>) -> Self {
        self.startup_hooks.push(hook);
        self
    }

    /// Dispatches one invocation. Never fails: untranslatable events become
    /// `400` responses and application panics become `500` responses.
    pub async fn handle(&self, event: &Value) -> Value {
        if self.lifespan == Lifespan::On {
            self.started.get_or_init(|| self.run_startup()).await;
        }

        let shape = EventShape::detect(event);
        let request = match event::to_request(event, &self.base_path) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejecting invocation event: {}", e);
                return helpers::err_response(400, &e.to_string());
            }
        };

        let dispatch = self.router.clone().oneshot(request);
        let response = match AssertUnwindSafe(dispatch).catch_unwind().await {
            Ok(result) => result.unwrap_or_else(|never| match never {}),
            Err(_) => {
                error!("Application panicked while handling request");
                return helpers::err_response(500, "Internal Server Error");
            }
        };

        match response::to_event_response(response, shape).await {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to serialize application response: {}", e);
                helpers::err_response(500, "Internal Server Error")
            }
        }
    }

    async fn run_startup(&self) {
        for hook in &self.startup_hooks {
            match hook.on_startup().await {
                Ok(()) => info!(hook = hook.name(), "Startup hook completed"),
                Err(e) => error!(hook = hook.name(), "Startup hook failed: {}", e),
            }
        }
    }
}
