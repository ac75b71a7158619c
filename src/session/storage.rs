use serde_json::{Map, Value};

use crate::error::Result;

/// Key-value document store backing all persisted state.
///
/// Every call completes synchronously, so a read-normalize-write sequence
/// never interleaves with another task touching the same keys.
pub trait StateStore: Send + Sync {
    /// Read the given keys; missing keys are absent from the returned map.
    fn get(&self, keys: &[&str]) -> Result<Map<String, Value>>;

    /// Merge the given entries into the store.
    fn set(&self, entries: Map<String, Value>) -> Result<()>;

    /// Remove the given keys.
    fn remove(&self, keys: &[&str]) -> Result<()>;
}
