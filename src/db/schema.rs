use sqlx::AnyConnection;
use tracing::debug;

use super::engine::BackendKind;
use crate::errors::ShimError;

const POSTGRES_TABLES: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        username TEXT NOT NULL,
        hashed_password TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    r"CREATE TABLE IF NOT EXISTS tasks (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        completed BOOLEAN NOT NULL DEFAULT FALSE,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
];

const SQLITE_TABLES: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        username TEXT NOT NULL,
        hashed_password TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    r"CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        completed BOOLEAN NOT NULL DEFAULT 0,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
];

#[must_use]
pub fn table_statements(kind: BackendKind) -> &'static [&'static str] {
    match kind {
        BackendKind::Postgres => POSTGRES_TABLES,
        BackendKind::SqliteFile | BackendKind::SqliteMemory => SQLITE_TABLES,
    }
}

/// Idempotent: every statement is `CREATE TABLE IF NOT EXISTS`.
pub async fn create_all(conn: &mut AnyConnection, kind: BackendKind) -> Result<(), ShimError> {
    for statement in table_statements(kind) {
        sqlx::query(*statement).execute(&mut *conn).await?;
    }
    debug!(kind = ?kind, "Schema ensured");
    Ok(())
}
