//! Key-value storage for saved designs

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage is unavailable: {0}")]
    Unavailable(String),
    #[error("Storage is full")]
    QuotaExceeded,
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage file is corrupt: {0}")]
    Corrupt(String),
}

/// Designs keyed by name
pub trait DesignStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError>;
    fn put(&mut self, name: &str, json: &str) -> Result<(), StoreError>;
    /// Returns false if nothing was stored under `name`
    fn remove(&mut self, name: &str) -> Result<bool, StoreError>;
    fn names(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory store with an optional size quota
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes once the stored text would exceed `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota_bytes: Some(bytes),
        }
    }

    fn used_bytes_without(&self, name: &str) -> usize {
        self.entries
            .iter()
            .filter(|(key, _)| key.as_str() != name)
            .map(|(key, value)| key.len() + value.len())
            .sum()
    }
}

impl DesignStore for MemoryStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(name).cloned())
    }

    fn put(&mut self, name: &str, json: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota_bytes {
            if self.used_bytes_without(name) + name.len() + json.len() > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }
        self.entries.insert(name.to_string(), json.to_string());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(name).is_some())
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// All designs in one JSON file, rewritten through a temp file on change
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStore {
    path: std::path::PathBuf,
    entries: BTreeMap<String, String>,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<std::path::PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        log::info!("Opened design store {} ({} designs)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl DesignStore for FileStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(name).cloned())
    }

    fn put(&mut self, name: &str, json: &str) -> Result<(), StoreError> {
        let previous = self.entries.insert(name.to_string(), json.to_string());
        if let Err(e) = self.flush() {
            // Keep memory in step with the file
            match previous {
                Some(old) => self.entries.insert(name.to_string(), old),
                None => self.entries.remove(name),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<bool, StoreError> {
        let Some(previous) = self.entries.remove(name) else {
            return Ok(false);
        };
        if let Err(e) = self.flush() {
            self.entries.insert(name.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Browser LocalStorage, one key per design
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    const KEY_PREFIX: &'static str = "tumble_lab_design:";

    pub fn open() -> Result<Self, StoreError> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| StoreError::Unavailable("LocalStorage is disabled".to_string()))?;
        Ok(Self { storage })
    }

    fn key(name: &str) -> String {
        format!("{}{}", Self::KEY_PREFIX, name)
    }
}

#[cfg(target_arch = "wasm32")]
impl DesignStore for LocalStorageStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.storage
            .get_item(&Self::key(name))
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))
    }

    fn put(&mut self, name: &str, json: &str) -> Result<(), StoreError> {
        // set_item only fails on quota or a disabled store
        self.storage
            .set_item(&Self::key(name), json)
            .map_err(|_| StoreError::QuotaExceeded)
    }

    fn remove(&mut self, name: &str) -> Result<bool, StoreError> {
        let existed = self.get(name)?.is_some();
        self.storage
            .remove_item(&Self::key(name))
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))?;
        Ok(existed)
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        let len = self
            .storage
            .length()
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))?;
        let mut names = Vec::new();
        for i in 0..len {
            if let Ok(Some(key)) = self.storage.key(i) {
                if let Some(name) = key.strip_prefix(Self::KEY_PREFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        store.put("a", "{}").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("{}"));
        assert_eq!(store.names().unwrap(), vec!["a".to_string()]);
        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_memory_store_quota() {
        let mut store = MemoryStore::with_quota(10);
        store.put("a", "12345").unwrap();
        assert!(matches!(store.put("b", "123456789"), Err(StoreError::QuotaExceeded)));
        // Overwriting counts only the new value
        store.put("a", "123456789").unwrap();
        assert_eq!(store.names().unwrap().len(), 1);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = std::env::temp_dir().join(format!("tumble_lab_store_{}", std::process::id()));
        let path = dir.join("designs.json");
        let _ = std::fs::remove_file(&path);

        let mut store = FileStore::open(&path).unwrap();
        assert!(store.names().unwrap().is_empty());
        store.put("tower", r#"{"version":1}"#).unwrap();
        store.put("ramp run", "{}").unwrap();
        assert!(store.remove("ramp run").unwrap());

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.names().unwrap(), vec!["tower".to_string()]);
        assert_eq!(
            reopened.get("tower").unwrap().as_deref(),
            Some(r#"{"version":1}"#)
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_store_reports_corrupt_file() {
        let dir = std::env::temp_dir().join(format!("tumble_lab_corrupt_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("designs.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(FileStore::open(&path), Err(StoreError::Corrupt(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
