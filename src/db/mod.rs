//! Database session provider: engine construction, schema bootstrap and
//! per-request sessions.

pub mod engine;
pub mod schema;
pub mod session;

pub use engine::{BackendKind, Database, PoolSettings, Provisioned};
pub use session::Session;
