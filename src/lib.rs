/// Todo backend - serverless deployment of a small users/tasks web backend.
///
/// The crate adapts an `axum` application to a function-as-a-service
/// invocation model:
/// 1. An API function that binds the application (or, if initialization
///    fails, a diagnostic health-check application) to an adapter translating
///    invocation events into HTTP requests
/// 2. A proxy function that forwards `/api/*` calls to a configured backend
///
/// # Architecture
///
/// The system uses:
/// - `lambda_runtime` for the invocation loop
/// - `axum` routers driven through `tower::ServiceExt::oneshot`
/// - `sqlx` `AnyPool` with serverless-sized pooling for Postgres, default
///   pooling for SQLite, and an in-memory SQLite fallback
/// - Tokio for async runtime
///
/// # Example
///
/// ```no_run
/// use todo_backend::bootstrap;
/// use todo_backend::handler::Handler;
/// use todo_backend::readiness;
///
/// #[tokio::main]
/// async fn main() {
///     todo_backend::setup_logging();
///
///     // Falls back to the diagnostic app instead of failing.
///     let handler = Handler::initialize(bootstrap::primary_from_env);
///
///     let response = handler
///         .dispatch(&readiness::synthetic_event("GET", "/health"))
///         .await;
///     println!("{response}");
/// }
/// ```
pub mod adapter;
pub mod api;
pub mod bootstrap;
pub mod core;
pub mod db;
pub mod errors;
pub mod handler;
pub mod proxy;
pub mod readiness;

pub use errors::ShimError;
pub use handler::Handler;

/// Configure structured logging with JSON format for function log sinks.
///
/// The default level is `info`, or `debug` when `DEBUG` is truthy; `RUST_LOG`
/// overrides both. Calling it again after a subscriber is installed is a no-op.
///
/// # Example
///
/// ```
/// todo_backend::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let debug = std::env::var("DEBUG")
        .ok()
        .is_some_and(|raw| crate::core::config::debug_enabled(&raw));
    let default_level = if debug || cfg!(feature = "debug-logs") {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
