use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::state::PersistedState;

/// Fixed key the panel record lives under.
pub(crate) const STATE_KEY: &str = "composeRelay.state";

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("I/O error on {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("corrupt state record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable key-value storage owned by the Controller.
pub(crate) trait StateStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<PersistedState>, StoreError>;
    fn save(&self, state: &PersistedState) -> Result<(), StoreError>;
}

/// Default location of the state file.
pub(crate) fn default_state_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("compose-relay/state.json")
}

/// JSON document on disk mapping storage keys to records.
///
/// Other keys in the document are preserved on write. Writes go through a
/// sibling temp file and a rename, so a crash never leaves a torn file.
pub(crate) struct FileStore {
    path: PathBuf,
    key: String,
    lock: Mutex<()>,
}

impl FileStore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: STATE_KEY.to_string(),
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, error: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            error,
        }
    }

    fn read_document(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl StateStore for FileStore {
    fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        let _guard = self.lock.lock();
        let mut document = self.read_document()?;
        match document.remove(&self.key) {
            Some(record) => Ok(Some(serde_json::from_value(record)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut document = self.read_document()?;
        document.insert(self.key.clone(), serde_json::to_value(state)?);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(&Value::Object(document))?;
        std::fs::write(&tmp, body).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        tracing::trace!(path = %self.path.display(), "state saved");
        Ok(())
    }
}
