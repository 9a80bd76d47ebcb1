//! Checks that the API function initializes and serves its expected routes,
//! using the current environment. Exits non-zero when it is not ready.
//!
//! `--json` prints the report as JSON instead of the human-readable summary.

use std::process::ExitCode;

use todo_backend::bootstrap;
use todo_backend::handler::Handler;
use todo_backend::readiness;

#[tokio::main]
async fn main() -> ExitCode {
    todo_backend::setup_logging();

    let handler = Handler::initialize(bootstrap::primary_from_env);
    let report = readiness::check(&handler).await;

    if std::env::args().skip(1).any(|arg| arg == "--json") {
        return match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{json}");
                if report.is_ready() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(e) => {
                eprintln!("Failed to serialize readiness report: {e}");
                ExitCode::FAILURE
            }
        };
    }

    println!("Deployment readiness");
    println!("{}", "=".repeat(40));
    if let Some(reason) = &report.initialization_error {
        println!("[ERROR] Application failed to initialize: {reason}");
    } else {
        println!("[OK] Application initialized");
    }
    for route in &report.routes {
        let tag = if route.passed() { "OK" } else { "ERROR" };
        println!("[{tag}] GET {} -> {} {}", route.path, route.status, route.body);
    }

    if report.is_ready() {
        println!("[SUCCESS] Ready to deploy.");
        ExitCode::SUCCESS
    } else {
        println!("Fix the issues above before deploying.");
        ExitCode::FAILURE
    }
}
