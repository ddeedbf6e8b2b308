//! Local list of batch ids the user has created or opened.
//!
//! Only opaque ids are kept; everything else is fetched from the backend.
//! Newest first, without duplicates.

use crate::error::{PerunError, Result};
#[cfg(not(target_arch = "wasm32"))]
use directories::ProjectDirs;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persistence for batch ids
pub trait BatchStore {
    /// Ids, newest first
    fn list(&self) -> Result<Vec<String>>;
    /// Move `batch_id` to the front, adding it if unknown
    fn add(&mut self, batch_id: &str) -> Result<()>;
    /// Returns whether the id was present
    fn remove(&mut self, batch_id: &str) -> Result<bool>;
    fn clear(&mut self) -> Result<()>;
}

fn push_front(ids: &mut Vec<String>, batch_id: &str) -> Result<()> {
    let batch_id = batch_id.trim();
    if batch_id.is_empty() {
        return Err(PerunError::Storage("batch id is empty".to_string()));
    }
    ids.retain(|id| id != batch_id);
    ids.insert(0, batch_id.to_string());
    Ok(())
}

/// Parse a stored JSON list of ids; missing means empty
fn decode_ids(raw: Option<&str>, origin: &str) -> Result<Vec<String>> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| PerunError::Storage(format!("Corrupt batch list {}: {}", origin, e))),
    }
}

fn remove_id(ids: &mut Vec<String>, batch_id: &str) -> bool {
    let before = ids.len();
    ids.retain(|id| id != batch_id);
    ids.len() != before
}

/// In-memory store, used by tests and as a fallback
#[derive(Debug, Clone, Default)]
pub struct MemoryBatchStore {
    ids: Vec<String>,
}

impl MemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchStore for MemoryBatchStore {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.ids.clone())
    }

    fn add(&mut self, batch_id: &str) -> Result<()> {
        push_front(&mut self.ids, batch_id)
    }

    fn remove(&mut self, batch_id: &str) -> Result<bool> {
        Ok(remove_id(&mut self.ids, batch_id))
    }

    fn clear(&mut self) -> Result<()> {
        self.ids.clear();
        Ok(())
    }
}

/// JSON file store in the platform data directory
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileBatchStore {
    path: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileBatchStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/batches.json`
    pub fn default_location() -> Result<Self> {
        let project_dirs = ProjectDirs::from("org", "perun", "perun").ok_or_else(|| {
            PerunError::Configuration("Failed to get XDG directories".to_string())
        })?;
        Ok(Self::new(project_dirs.data_dir().join("batches.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, ids: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PerunError::Storage(format!("Failed to create data directory: {}", e))
            })?;
        }

        // Write to a temporary file first, then rename
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_vec_pretty(ids)?)?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            PerunError::Storage(format!("Failed to replace {:?}: {}", self.path, e))
        })?;
        debug!("Saved {} batch id(s) to {:?}", ids.len(), self.path);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl BatchStore for FileBatchStore {
    fn list(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        decode_ids(Some(&raw), &format!("{:?}", self.path))
    }

    fn add(&mut self, batch_id: &str) -> Result<()> {
        let mut ids = self.list()?;
        push_front(&mut ids, batch_id)?;
        self.write(&ids)
    }

    fn remove(&mut self, batch_id: &str) -> Result<bool> {
        let mut ids = self.list()?;
        if !remove_id(&mut ids, batch_id) {
            return Ok(false);
        }
        self.write(&ids)?;
        Ok(true)
    }

    fn clear(&mut self) -> Result<()> {
        self.write(&[])
    }
}

/// localStorage key holding the JSON list of ids
pub const BATCH_IDS_KEY: &str = "perun_batch_ids";

/// Browser store under [`BATCH_IDS_KEY`], so the list survives reloads
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct LocalStorageBatchStore {
    key: String,
}

#[cfg(target_arch = "wasm32")]
impl Default for LocalStorageBatchStore {
    fn default() -> Self {
        Self::new(BATCH_IDS_KEY)
    }
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageBatchStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn storage(&self) -> Result<web_sys::Storage> {
        let window = web_sys::window()
            .ok_or_else(|| PerunError::Storage("no browser window".to_string()))?;
        window
            .local_storage()
            .map_err(|e| PerunError::Storage(format!("localStorage unavailable: {:?}", e)))?
            .ok_or_else(|| PerunError::Storage("localStorage is disabled".to_string()))
    }

    fn write(&self, ids: &[String]) -> Result<()> {
        let raw = serde_json::to_string(ids)?;
        self.storage()?
            .set_item(&self.key, &raw)
            .map_err(|e| PerunError::Storage(format!("Failed to save batch list: {:?}", e)))?;
        debug!("Saved {} batch id(s) to localStorage", ids.len());
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
impl BatchStore for LocalStorageBatchStore {
    fn list(&self) -> Result<Vec<String>> {
        let raw = self
            .storage()?
            .get_item(&self.key)
            .map_err(|e| PerunError::Storage(format!("Failed to read batch list: {:?}", e)))?;
        decode_ids(raw.as_deref(), &self.key)
    }

    fn add(&mut self, batch_id: &str) -> Result<()> {
        let mut ids = self.list()?;
        push_front(&mut ids, batch_id)?;
        self.write(&ids)
    }

    fn remove(&mut self, batch_id: &str) -> Result<bool> {
        let mut ids = self.list()?;
        if !remove_id(&mut ids, batch_id) {
            return Ok(false);
        }
        self.write(&ids)?;
        Ok(true)
    }

    fn clear(&mut self) -> Result<()> {
        self.write(&[])
    }
}
