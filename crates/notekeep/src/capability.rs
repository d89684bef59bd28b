//! Primary backend capability detection.
//!
//! The SQLite engine is considered usable when the linked library is recent
//! enough and a probe connection on the configured database can begin and
//! roll back a write transaction. The write probe catches the case where a
//! database opens fine but cannot persist anything (read-only media,
//! locked-down sandbox). Every failure reads as "unsupported"; nothing is
//! propagated to the caller.

use crate::config::{BackendPreference, StorageConfig};
use crate::error::{NotekeepError, Result};
use crate::store::sqlite::pool::open_connection;
use std::time::Duration;
use tracing::{debug, info};

/// Oldest SQLite release the schema has been exercised against (3.24.0).
const MIN_SQLITE_VERSION: i32 = 3_024_000;

pub fn is_primary_backend_supported(config: &StorageConfig) -> bool {
    match config.backend_preference() {
        Ok(BackendPreference::Kv) => {
            debug!("primary backend disabled by configuration");
            return false;
        }
        Ok(_) => {}
        Err(err) => {
            info!(error = %err, "invalid backend preference; treating primary as unsupported");
            return false;
        }
    }

    match probe(config) {
        Ok(()) => true,
        Err(err) => {
            info!(error = %err, "primary backend probe failed");
            false
        }
    }
}

fn probe(config: &StorageConfig) -> Result<()> {
    let version = rusqlite::version_number();
    if version < MIN_SQLITE_VERSION {
        return Err(NotekeepError::BackendUnavailable(format!(
            "sqlite {} is older than required",
            rusqlite::version()
        )));
    }

    let conn = open_connection(&config.database_location()?)?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    conn.execute_batch("BEGIN IMMEDIATE; ROLLBACK;")?;
    Ok(())
}
