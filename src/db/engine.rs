//! Connection engine construction.
//!
//! The engine is an `AnyPool` whose options depend on the backend the
//! connection string points at. Networked Postgres gets a tiny, pre-pinged,
//! frequently recycled pool because each serverless instance is short lived
//! and providers cap concurrent connections. Local SQLite files keep the
//! driver defaults. Anything that cannot be built degrades to in-memory
//! SQLite so the process can still start.
//!
//! Construction is lazy (no connection is opened here) but spawns the pool's
//! maintenance task, so it must run inside a Tokio runtime.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::LevelFilter;
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::postgres::PgConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{AnyPool, ConnectOptions, Executor};
use tracing::{info, warn};

use super::schema;
use super::session::Session;
use crate::core::config::DatabaseConfig;
use crate::errors::ShimError;

/// URL the degraded engine connects to.
pub const MEMORY_DATABASE_URL: &str = "sqlite::memory:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Postgres,
    SqliteFile,
    SqliteMemory,
}

impl BackendKind {
    #[must_use]
    pub fn is_persistent(self) -> bool {
        !matches!(self, BackendKind::SqliteMemory)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    pub test_before_acquire: bool,
    pub statement_timeout: Option<Duration>,
}

impl PoolSettings {
    /// Base pool of one connection plus an overflow of two.
    pub const SERVERLESS_POOL_SIZE: u32 = 1;
    pub const SERVERLESS_MAX_OVERFLOW: u32 = 2;
    pub const SERVERLESS_RECYCLE: Duration = Duration::from_secs(300);
    pub const SERVERLESS_TIMEOUT: Duration = Duration::from_secs(15);

    #[must_use]
    pub fn serverless() -> Self {
        Self {
            max_connections: Self::SERVERLESS_POOL_SIZE + Self::SERVERLESS_MAX_OVERFLOW,
            min_connections: 0,
            acquire_timeout: Self::SERVERLESS_TIMEOUT,
            idle_timeout: Some(Duration::from_secs(60)),
            max_lifetime: Some(Self::SERVERLESS_RECYCLE),
            test_before_acquire: true,
            statement_timeout: Some(Self::SERVERLESS_TIMEOUT),
        }
    }

    /// sqlx pool defaults.
    #[must_use]
    pub fn local() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            test_before_acquire: true,
            statement_timeout: None,
        }
    }

    /// Every SQLite `:memory:` connection is its own database, so the pool
    /// pins a single connection that never idles out or gets recycled.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Self::SERVERLESS_TIMEOUT,
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: false,
            statement_timeout: None,
        }
    }

    #[must_use]
    pub fn for_kind(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Postgres => Self::serverless(),
            BackendKind::SqliteFile => Self::local(),
            BackendKind::SqliteMemory => Self::in_memory(),
        }
    }

    fn pool_options(&self) -> AnyPoolOptions {
        let mut options = AnyPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .test_before_acquire(self.test_before_acquire);

        if let Some(timeout) = self.statement_timeout {
            let statement = format!("SET statement_timeout = {}", timeout.as_millis());
            options = options.after_connect(move |conn, _meta| {
                let statement = statement.clone();
                Box::pin(async move {
                    conn.execute(statement.as_str()).await?;
                    Ok(())
                })
            });
        }

        options
    }
}

/// Outcome of a recoverable setup stage.
#[derive(Debug)]
pub enum Provisioned<T> {
    Ready(T),
    Degraded { value: T, reason: String },
}

impl<T> Provisioned<T> {
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Provisioned::Ready(value) | Provisioned::Degraded { value, .. } => value,
        }
    }

    #[must_use]
    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Provisioned::Ready(_) => None,
            Provisioned::Degraded { reason, .. } => Some(reason),
        }
    }
}

#[derive(Debug)]
pub struct Database {
    pool: AnyPool,
    kind: BackendKind,
    target: String,
    settings: PoolSettings,
    active_sessions: Arc<AtomicUsize>,
}

impl Database {
    /// Builds the engine for `config`, degrading to in-memory SQLite when the
    /// configured backend cannot be built. Only fails if the in-memory engine
    /// itself cannot be built.
    pub fn connect(config: &DatabaseConfig) -> Result<Provisioned<Self>, ShimError> {
        match Self::build(&config.url, config.echo) {
            Ok(db) => {
                info!(
                    target_url = %redact_url(&config.url),
                    kind = ?db.kind,
                    max_connections = db.settings.max_connections,
                    "Database engine configured"
                );
                Ok(Provisioned::Ready(db))
            }
            Err(e) => {
                warn!(
                    target_url = %redact_url(&config.url),
                    "Database engine construction failed, using in-memory store: {}",
                    e
                );
                let value = Self::in_memory(config.echo)?;
                Ok(Provisioned::Degraded {
                    value,
                    reason: e.to_string(),
                })
            }
        }
    }

    pub fn build(url: &str, echo: bool) -> Result<Self, ShimError> {
        let (kind, driver_url) = classify_url(url)?;
        let settings = PoolSettings::for_kind(kind);
        Self::with_settings(url, kind, &driver_url, settings, echo)
    }

    /// Like [`Database::build`] but with explicit pool settings.
    pub fn build_with(url: &str, settings: PoolSettings, echo: bool) -> Result<Self, ShimError> {
        let (kind, driver_url) = classify_url(url)?;
        Self::with_settings(url, kind, &driver_url, settings, echo)
    }

    pub fn in_memory(echo: bool) -> Result<Self, ShimError> {
        Self::with_settings(
            MEMORY_DATABASE_URL,
            BackendKind::SqliteMemory,
            MEMORY_DATABASE_URL,
            PoolSettings::in_memory(),
            echo,
        )
    }

    fn with_settings(
        target: &str,
        kind: BackendKind,
        driver_url: &str,
        settings: PoolSettings,
        echo: bool,
    ) -> Result<Self, ShimError> {
        sqlx::any::install_default_drivers();

        // Validate with the concrete driver first; `AnyConnectOptions` only
        // checks URL syntax and would defer the failure to the first request.
        match kind {
            BackendKind::Postgres => {
                PgConnectOptions::from_str(driver_url)?;
            }
            BackendKind::SqliteFile | BackendKind::SqliteMemory => {
                SqliteConnectOptions::from_str(driver_url)?;
            }
        }

        let connect_options = AnyConnectOptions::from_str(driver_url)?;
        let connect_options = if echo {
            connect_options.log_statements(LevelFilter::Info)
        } else {
            connect_options.disable_statement_logging()
        };

        let pool = settings.pool_options().connect_lazy_with(connect_options);

        Ok(Self {
            pool,
            kind,
            target: target.to_string(),
            settings,
            active_sessions: Arc::new(AtomicUsize::new(0)),
        })
    }

    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// The connection string this engine was built for.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    #[must_use]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Sessions handed out and not yet dropped.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    /// Creates the `users` and `tasks` tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), ShimError> {
        let mut conn = self.pool.acquire().await?;
        schema::create_all(&mut conn, self.kind).await
    }

    /// Acquires one session. Schema creation is attempted on the acquired
    /// connection first and any failure is only logged: the tables may
    /// already exist.
    pub async fn session(&self) -> Result<Session, ShimError> {
        let mut conn = self.pool.acquire().await?;
        if let Err(e) = schema::create_all(&mut conn, self.kind).await {
            warn!("Could not create tables: {}", e);
        }

        Ok(Session::new(conn, Arc::clone(&self.active_sessions)))
    }

    /// Runs `consumer` with an owned session; the session is released when
    /// the consumer's future completes, errors, or unwinds.
    pub async fn scoped<F, Fut, T>(&self, consumer: F) -> Result<T, ShimError>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = T>,
    {
        let session = self.session().await?;
        Ok(consumer(session).await)
    }
}

/// Maps a connection string to its backend and to a URL the sqlx drivers
/// accept. SQLAlchemy-style spellings (`sqlite:///path`,
/// `postgresql+psycopg2://`) are rewritten.
pub fn classify_url(url: &str) -> Result<(BackendKind, String), ShimError> {
    let url = url.trim();
    let Some((scheme, rest)) = url.split_once(':') else {
        return Err(ShimError::ConfigError(format!(
            "connection string has no scheme: {}",
            redact_url(url)
        )));
    };
    let scheme = scheme.to_ascii_lowercase();
    let driver = scheme.split('+').next().unwrap_or_default();

    match driver {
        "postgres" | "postgresql" => {
            let Some(authority) = rest.strip_prefix("//") else {
                return Err(ShimError::ConfigError(format!(
                    "malformed postgres connection string: {}",
                    redact_url(url)
                )));
            };
            Ok((BackendKind::Postgres, format!("postgres://{authority}")))
        }
        "sqlite" => {
            // `sqlite:///path` (three slashes) is a relative or absolute file path.
            let path = rest
                .strip_prefix("///")
                .or_else(|| rest.strip_prefix("//"))
                .unwrap_or(rest);
            let (file, query) = match path.split_once('?') {
                Some((file, query)) => (file, Some(query)),
                None => (path, None),
            };

            if file.is_empty() || file == ":memory:" {
                return Ok((BackendKind::SqliteMemory, MEMORY_DATABASE_URL.to_string()));
            }

            let query = match query {
                Some(q) if q.split('&').any(|kv| kv.starts_with("mode=")) => q.to_string(),
                Some(q) if !q.is_empty() => format!("{q}&mode=rwc"),
                _ => "mode=rwc".to_string(),
            };
            Ok((BackendKind::SqliteFile, format!("sqlite://{file}?{query}")))
        }
        other => Err(ShimError::ConfigError(format!(
            "unsupported database scheme: {other}"
        ))),
    }
}

/// Masks the password of a connection string for logging.
#[must_use]
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((auth, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match auth.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_sqlalchemy_sqlite_paths() {
        let (kind, url) = classify_url("sqlite:///./test.db").unwrap();
        assert_eq!(kind, BackendKind::SqliteFile);
        assert_eq!(url, "sqlite://./test.db?mode=rwc");

        let (kind, url) = classify_url("sqlite:////var/data/app.db").unwrap();
        assert_eq!(kind, BackendKind::SqliteFile);
        assert_eq!(url, "sqlite:///var/data/app.db?mode=rwc");
    }

    #[test]
    fn classifies_memory_spellings() {
        for raw in ["sqlite://", "sqlite:///:memory:", "sqlite::memory:"] {
            let (kind, url) = classify_url(raw).unwrap();
            assert_eq!(kind, BackendKind::SqliteMemory, "{raw}");
            assert_eq!(url, MEMORY_DATABASE_URL);
        }
    }

    #[test]
    fn keeps_explicit_sqlite_mode() {
        let (_, url) = classify_url("sqlite://data.db?mode=ro").unwrap();
        assert_eq!(url, "sqlite://data.db?mode=ro");
    }

    #[test]
    fn strips_driver_suffix_from_postgres() {
        let (kind, url) = classify_url("postgresql+psycopg2://u:p@db.example.com/app").unwrap();
        assert_eq!(kind, BackendKind::Postgres);
        assert_eq!(url, "postgres://u:p@db.example.com/app");
    }

    #[test]
    fn rejects_unknown_schemes() {
        assert!(classify_url("mysql://localhost/app").is_err());
        assert!(classify_url("not a url").is_err());
    }

    #[test]
    fn redacts_passwords() {
        assert_eq!(
            redact_url("postgres://admin:hunter2@db:5432/app"),
            "postgres://admin:***@db:5432/app"
        );
        assert_eq!(redact_url("sqlite:///./test.db"), "sqlite:///./test.db");
    }
}
