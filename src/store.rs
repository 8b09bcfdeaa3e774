//! Local persistence
//!
//! Opaque key-value blobs, read wholesale at startup and overwritten
//! wholesale on every change. No partial updates, no schema versioning.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::BridgeError;

pub const HISTORY_KEY: &str = "tx_history";
pub const RECIPIENTS_KEY: &str = "saved_recipients";
pub const SETTINGS_KEY: &str = "settings";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, BridgeError>;
    fn set(&self, key: &str, value: &str) -> Result<(), BridgeError>;
    fn remove(&self, key: &str) -> Result<(), BridgeError>;
}

/// One JSON file per key inside a data directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) the data directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| BridgeError::Storage(format!("create {}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, BridgeError> {
        match fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BridgeError::Storage(format!("read {}: {}", key, e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BridgeError> {
        // Write-then-rename so a crash never leaves a half-written blob
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, value).map_err(|e| BridgeError::Storage(format!("write {}: {}", key, e)))?;
        fs::rename(&tmp, self.path(key))
            .map_err(|e| BridgeError::Storage(format!("rename {}: {}", key, e)))
    }

    fn remove(&self, key: &str) -> Result<(), BridgeError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BridgeError::Storage(format!("remove {}: {}", key, e))),
        }
    }
}

/// Read and decode a blob. A missing or undecodable blob yields `None`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key = key, error = %e, "Discarding undecodable stored value");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(key = key, error = %e, "Failed to read stored value");
            None
        }
    }
}

/// Encode and overwrite a blob.
pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), BridgeError> {
    let raw = serde_json::to_string(value)
        .map_err(|e| BridgeError::Storage(format!("encode {}: {}", key, e)))?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "[1,2]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[1,2]"));
        store.set("k", "[3]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[3]"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // removing twice is fine
        store.remove("k").unwrap();
    }

    #[test]
    fn test_open_creates_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        JsonFileStore::open(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_json_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        save_json(&store, "list", &vec!["a".to_string(), "b".to_string()]).unwrap();
        let back: Option<Vec<String>> = load_json(&store, "list");
        assert_eq!(back.unwrap(), vec!["a", "b"]);

        store.set("bad", "{not json").unwrap();
        let bad: Option<Vec<String>> = load_json(&store, "bad");
        assert!(bad.is_none());
    }
}
