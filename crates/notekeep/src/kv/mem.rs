use super::KvEngine;
use crate::error::{NotekeepError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory key-value engine.
///
/// Uses a `parking_lot::Mutex` so it can be shared across the async
/// runtime's worker threads.
pub struct MemKv {
    entries: Mutex<HashMap<String, String>>,
    simulate_write_error: AtomicBool,
    simulate_read_error: AtomicBool,
    unavailable: AtomicBool,
}

impl Default for MemKv {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            simulate_write_error: AtomicBool::new(false),
            simulate_read_error: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
        }
    }
}

impl MemKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Make every `get` fail, as a flaky disk would.
    pub fn set_simulate_read_error(&self, simulate: bool) {
        self.simulate_read_error.store(simulate, Ordering::SeqCst);
    }

    /// Make the engine report itself unusable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Test helper to plant a raw value (e.g. a corrupted blob).
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }
}

impl KvEngine for MemKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.simulate_read_error.load(Ordering::SeqCst) {
            return Err(NotekeepError::Store("Simulated read error".to_string()));
        }
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(NotekeepError::Store("Simulated write error".to_string()));
        }
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(NotekeepError::Store("Simulated write error".to_string()));
        }
        self.entries.lock().remove(key);
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }
}
