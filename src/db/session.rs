use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sqlx::AnyConnection;
use sqlx::pool::PoolConnection;
use sqlx::{Any, Connection};

use crate::errors::ShimError;

/// A pooled connection checked out for one request.
///
/// Dropping the session returns the connection to the pool, so release
/// happens on every exit path of the owner, including `?` returns and panics.
/// Queries run against `&mut *session`.
#[derive(Debug)]
pub struct Session {
    conn: PoolConnection<Any>,
    _lease: Lease,
}

impl Session {
    pub(crate) fn new(conn: PoolConnection<Any>, active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            conn,
            _lease: Lease(active),
        }
    }

    /// Round-trips to the database; used by health checks.
    pub async fn ping(&mut self) -> Result<(), ShimError> {
        self.conn.ping().await?;
        Ok(())
    }
}

impl Deref for Session {
    type Target = AnyConnection;

    fn deref(&self) -> &AnyConnection {
        &self.conn
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut AnyConnection {
        &mut self.conn
    }
}

#[derive(Debug)]
struct Lease(Arc<AtomicUsize>);

impl Drop for Lease {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
