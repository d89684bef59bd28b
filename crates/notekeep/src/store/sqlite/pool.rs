//! SQLite connection handle.
//!
//! A single `Arc<Mutex<Connection>>`: SQLite serializes writers anyway, and
//! the façade never issues storage work in parallel. Blocking calls are
//! moved off the async runtime with `spawn_blocking`.

use super::schema;
use crate::config::{DatabaseLocation, StorageConfig};
use crate::error::{NotekeepError, Result};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePool {
    /// Opens the configured database, applies pragmas and migrations.
    /// Returns only once the schema is ready for transactions.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let started_at = Instant::now();
        let location = config.database_location()?;
        info!(location = ?location, "opening sqlite database");

        let mut conn = open_connection(&location)?;
        configure(&conn, config.busy_timeout_ms)?;
        schema::apply_migrations(&mut conn)?;

        info!(
            duration_ms = started_at.elapsed().as_millis() as u64,
            "sqlite database ready"
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute a closure with exclusive access to the connection.
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }

    /// Run a closure against the connection on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.with_connection(f))
            .await
            .map_err(|e| NotekeepError::Store(format!("sqlite task failed: {e}")))?
    }
}

pub(crate) fn open_connection(location: &DatabaseLocation) -> Result<Connection> {
    let conn = match location {
        DatabaseLocation::Memory => Connection::open_in_memory()?,
        DatabaseLocation::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(path)?
        }
    };
    Ok(conn)
}

fn configure(conn: &Connection, busy_timeout_ms: u64) -> Result<()> {
    debug!("configuring sqlite pragmas");
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(())
}
