//! Cold-start application selection and the function entry point.
//!
//! Initialization runs once per process. If it fails (returns an error or
//! panics) the handler binds the diagnostic application instead of letting
//! the failure reach the platform as an opaque crash.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use axum::Router;
use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

use crate::adapter::{Adapter, Lifespan, StartupHook};
use crate::api::diagnostic;
use crate::errors::ShimError;

/// A successfully initialized application, ready to be bound to the adapter.
pub struct PrimaryApp {
    pub router: Router,
    pub base_path: String,
    pub startup_hooks: Vec<Arc<dyn StartupHook>>,
}

impl PrimaryApp {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            router,
            base_path: "/".to_string(),
            startup_hooks: Vec::new(),
        }
    }
}

pub enum AppSelection {
    Primary(PrimaryApp),
    Diagnostic { reason: String },
}

impl AppSelection {
    /// Runs `init` and picks the application to serve.
    pub fn select<F>(init: F) -> Self
    where
        F: FnOnce() -> Result<PrimaryApp, ShimError>,
    {
        match panic::catch_unwind(AssertUnwindSafe(init)) {
            Ok(Ok(app)) => AppSelection::Primary(app),
            Ok(Err(e)) => {
                error!("Failed to initialize application: {}", e);
                AppSelection::Diagnostic {
                    reason: e.to_string(),
                }
            }
            Err(payload) => {
                let reason = format!(
                    "Failed to initialize application: panicked: {}",
                    panic_message(payload.as_ref())
                );
                error!("{}", reason);
                AppSelection::Diagnostic { reason }
            }
        }
    }

    fn into_adapter(self) -> Adapter {
        match self {
            // Startup hooks stay registered but never run: the platform, not
            // the application, owns the process lifecycle.
            AppSelection::Primary(app) => app
                .startup_hooks
                .into_iter()
                .fold(Adapter::new(app.router), Adapter::on_startup)
                .base_path(app.base_path)
                .lifespan(Lifespan::Off),
            AppSelection::Diagnostic { reason } => {
                Adapter::new(diagnostic::router(&reason)).lifespan(Lifespan::Off)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

pub struct Handler {
    adapter: Adapter,
    failure: Option<String>,
}

impl Handler {
    pub fn initialize<F>(init: F) -> Self
    where
        F: FnOnce() -> Result<PrimaryApp, ShimError>,
    {
        Self::from_selection(AppSelection::select(init))
    }

    #[must_use]
    pub fn from_selection(selection: AppSelection) -> Self {
        let failure = match &selection {
            AppSelection::Primary(_) => {
                info!("Primary application bound to adapter");
                None
            }
            AppSelection::Diagnostic { reason } => Some(reason.clone()),
        };

        Self {
            adapter: selection.into_adapter(),
            failure,
        }
    }

    /// Why the primary application is not being served, if it isn't.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }

    /// Lambda entry point; the invocation is delegated verbatim to the adapter.
    #[tracing::instrument(level = "info", skip(self, event), fields(request_id = %event.context.request_id))]
    pub async fn handle(&self, event: LambdaEvent<Value>) -> Result<Value, Error> {
        Ok(self.dispatch(&event.payload).await)
    }

    pub async fn dispatch(&self, payload: &Value) -> Value {
        self.adapter.handle(payload).await
    }
}
