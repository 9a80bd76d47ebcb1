use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::routing::get;
use lambda_runtime::{Context, LambdaEvent};
use serde_json::{Value, json};
use todo_backend::adapter::StartupHook;
use todo_backend::bootstrap;
use todo_backend::core::config::AppConfig;
use todo_backend::errors::ShimError;
use todo_backend::handler::{AppSelection, Handler, PrimaryApp};
use todo_backend::readiness::synthetic_event;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| env.get(key).cloned()
}

fn primary_with(pairs: &[(&str, &str)]) -> Result<PrimaryApp, ShimError> {
    let config = AppConfig::from_lookup(lookup_from(pairs))?;
    bootstrap::build_primary(&config)
}

fn body_json(response: &Value) -> Value {
    serde_json::from_str(response["body"].as_str().unwrap()).unwrap()
}

struct CountingHook(Arc<AtomicUsize>);

#[async_trait]
impl StartupHook for CountingHook {
    fn name(&self) -> &str {
        "counting"
    }

    async fn on_startup(&self) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_init_error_serves_diagnostic_health_check() {
    let handler = Handler::initialize(|| {
        Err(ShimError::InitError("No module named 'models'".to_string()))
    });

    assert!(handler.is_degraded());
    let response = handler.dispatch(&synthetic_event("GET", "/")).await;

    assert_eq!(response["statusCode"], 200);
    let body = body_json(&response);
    assert_eq!(body["status"], "error");
    let message = body["message"].as_str().unwrap();
    assert!(!message.is_empty());
    assert!(message.contains("No module named 'models'"));
}

#[tokio::test]
async fn test_init_panic_serves_diagnostic_health_check() {
    let handler = Handler::initialize(|| panic!("router construction blew up"));

    let response = handler.dispatch(&synthetic_event("GET", "/")).await;

    let body = body_json(&response);
    assert_eq!(body["status"], "error");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("router construction blew up")
    );
}

#[tokio::test]
async fn test_unrecognized_debug_value_still_serves_primary_app() {
    let handler = Handler::initialize(|| {
        primary_with(&[("DEBUG", "verbose"), ("DATABASE_URL", "sqlite::memory:")])
    });

    assert!(!handler.is_degraded());
    let health = handler.dispatch(&synthetic_event("GET", "/health")).await;
    assert_eq!(health["statusCode"], 200);
    assert_eq!(body_json(&health)["status"], "healthy");
}

#[tokio::test]
async fn test_diagnostic_app_only_exposes_root() {
    let handler = Handler::from_selection(AppSelection::Diagnostic {
        reason: "boom".to_string(),
    });

    let response = handler.dispatch(&synthetic_event("GET", "/health")).await;
    assert_eq!(response["statusCode"], 404);
}

#[tokio::test]
async fn test_primary_app_serves_root_and_health() {
    let handler = Handler::initialize(|| primary_with(&[("DATABASE_URL", "sqlite::memory:")]));
    assert!(!handler.is_degraded());

    let root = handler.dispatch(&synthetic_event("GET", "/")).await;
    assert_eq!(root["statusCode"], 200);
    assert_eq!(body_json(&root)["message"], "Todo API is running");

    let health = handler.dispatch(&synthetic_event("GET", "/health")).await;
    assert_eq!(health["statusCode"], 200);
    let body = body_json(&health);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["persistent"], false);
}

#[tokio::test]
async fn test_unbuildable_database_still_serves_primary_app() {
    let handler = Handler::initialize(|| {
        primary_with(&[("DATABASE_URL", "postgres://bad-host:notaport/db")])
    });

    assert!(!handler.is_degraded());
    let health = handler.dispatch(&synthetic_event("GET", "/health")).await;
    assert_eq!(health["statusCode"], 200);
    assert_eq!(body_json(&health)["persistent"], false);
}

#[tokio::test]
async fn test_primary_app_respects_base_path() {
    let handler = Handler::initialize(|| {
        primary_with(&[("DATABASE_URL", "sqlite::memory:"), ("API_BASE_PATH", "/api")])
    });

    let response = handler.dispatch(&synthetic_event("GET", "/api/health")).await;
    assert_eq!(response["statusCode"], 200);
}

#[tokio::test]
async fn test_primary_startup_hooks_do_not_run() {
    let runs = Arc::new(AtomicUsize::new(0));
    let hook_runs = Arc::clone(&runs);
    let handler = Handler::initialize(move || {
        let mut app = PrimaryApp::new(Router::new().route("/", get(|| async { "ok" })));
        app.startup_hooks.push(Arc::new(CountingHook(hook_runs)));
        Ok(app)
    });

    for _ in 0..2 {
        let response = handler.dispatch(&synthetic_event("GET", "/")).await;
        assert_eq!(response["body"], "ok");
    }

    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handle_delegates_lambda_event() {
    let handler = Handler::initialize(|| Err(ShimError::ConfigError("missing".to_string())));

    let event = LambdaEvent::new(
        json!({"httpMethod": "GET", "path": "/"}),
        Context::default(),
    );
    let response = handler.handle(event).await.unwrap();

    assert_eq!(response["statusCode"], 200);
    assert_eq!(body_json(&response)["status"], "error");
}
