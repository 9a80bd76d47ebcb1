//! Composition root for the API function: configuration → engine → router.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::adapter::StartupHook;
use crate::api::{AppState, routes};
use crate::core::config::AppConfig;
use crate::db::{Database, Provisioned};
use crate::errors::ShimError;
use crate::handler::PrimaryApp;

/// Creates tables at application startup. Registered on the primary app but
/// only run when the adapter enables its lifespan.
pub struct SchemaStartup {
    db: Arc<Database>,
}

impl SchemaStartup {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StartupHook for SchemaStartup {
    fn name(&self) -> &str {
        "create_db_and_tables"
    }

    async fn on_startup(&self) -> anyhow::Result<()> {
        self.db.ensure_schema().await?;
        Ok(())
    }
}

pub fn primary_from_env() -> Result<PrimaryApp, ShimError> {
    let config = AppConfig::from_env()?;
    build_primary(&config)
}

pub fn build_primary(config: &AppConfig) -> Result<PrimaryApp, ShimError> {
    let db = match Database::connect(&config.database())? {
        Provisioned::Ready(db) => db,
        Provisioned::Degraded { value, reason } => {
            warn!(
                reason = %reason,
                "Serving from in-memory database; data will not persist across invocations"
            );
            value
        }
    };
    let db = Arc::new(db);
    info!(kind = ?db.kind(), "Primary application initialized");

    Ok(PrimaryApp {
        router: routes::router(AppState { db: Arc::clone(&db) }),
        base_path: config.api_base_path.clone(),
        startup_hooks: vec![Arc::new(SchemaStartup::new(db))],
    })
}
