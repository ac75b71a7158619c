use super::storage::StateStore;
use crate::error::{PopchatError, Result};
use serde_json::{Map, Value};
use std::sync::Mutex;

/// In-process store, used by tests and by callers that do not persist.
#[derive(Default)]
pub struct MemoryStateStore {
    document: Mutex<Map<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Map<String, Value>) -> Self {
        Self {
            document: Mutex::new(entries),
        }
    }

    /// Copy of the whole document.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.document
            .lock()
            .map(|document| document.clone())
            .unwrap_or_default()
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, Map<String, Value>>> {
        self.document
            .lock()
            .map_err(|_| PopchatError::StoreError("state lock poisoned".into()))
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let document = self.locked()?;
        Ok(keys
            .iter()
            .filter_map(|key| document.get(*key).map(|value| (key.to_string(), value.clone())))
            .collect())
    }

    fn set(&self, entries: Map<String, Value>) -> Result<()> {
        self.locked()?.extend(entries);
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut document = self.locked()?;
        for key in keys {
            document.remove(*key);
        }
        Ok(())
    }
}
