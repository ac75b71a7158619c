use super::storage::StateStore;
use crate::error::{PopchatError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const STATE_FILE_NAME: &str = "state.json";

/// Stores the whole key-value document as one JSON file.
pub struct FilesystemStateStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FilesystemStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE_NAME)
    }

    fn read_document(&self, path: &Path) -> Result<Map<String, Value>> {
        if !path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(PopchatError::StoreError(format!(
                "{} does not hold a JSON object",
                path.display()
            ))),
        }
    }

    fn write_document(&self, path: &Path, document: &Map<String, Value>) -> Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(document)?;
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| PopchatError::StoreError("state lock poisoned".into()))
    }
}

impl StateStore for FilesystemStateStore {
    fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let _guard = self.guard()?;
        let document = self.read_document(&self.path())?;
        Ok(keys
            .iter()
            .filter_map(|key| document.get(*key).map(|value| (key.to_string(), value.clone())))
            .collect())
    }

    fn set(&self, entries: Map<String, Value>) -> Result<()> {
        let _guard = self.guard()?;
        let path = self.path();
        let mut document = self.read_document(&path)?;
        document.extend(entries);
        self.write_document(&path, &document)
    }

    fn remove(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.guard()?;
        let path = self.path();
        let mut document = self.read_document(&path)?;
        for key in keys {
            document.remove(*key);
        }
        self.write_document(&path, &document)
    }
}
