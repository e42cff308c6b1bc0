//! File-backed profile store.

use crate::{PersistentStore, StoreResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// JSON-file-backed store, one file per profile.
///
/// Every `get` re-reads the file and every `set`/`delete` rewrites it, so a
/// concurrent writer in another process of the same profile is observed on
/// the next read (last writer wins per key). The records kept here are tiny
/// singletons; rewriting the whole map is cheaper than being clever.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the given file. The file and its parent
    /// directory are created lazily on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> StoreResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_str(&content)?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(map.clone()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.read_map() {
            Ok(map) => map.get(key).and_then(|v| v.as_str().map(String::from)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Profile store read failed, treating as absent");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        let result = self.read_map().and_then(|mut map| {
            map.insert(key.to_string(), Value::String(value.to_string()));
            self.write_map(&map)
        });
        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "Profile store write failed, value dropped");
        }
    }

    fn delete(&self, key: &str) {
        let result = self.read_map().and_then(|mut map| {
            if map.remove(key).is_some() {
                self.write_map(&map)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "Profile store delete failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_get_delete_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("profile.json"));

        assert_eq!(store.get("auth_session"), None);

        store.set("auth_session", r#"{"identity":"a@x.com"}"#);
        assert_eq!(
            store.get("auth_session"),
            Some(r#"{"identity":"a@x.com"}"#.to_string())
        );
        assert!(store.has("auth_session"));

        store.delete("auth_session");
        assert_eq!(store.get("auth_session"), None);
        assert!(!store.has("auth_session"));
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");

        FileStore::new(&path).set("k", "v");

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_last_writer_wins_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");

        let a = FileStore::new(&path);
        let b = FileStore::new(&path);

        a.set("k", "from-a");
        b.set("k", "from-b");
        assert_eq!(a.get("k"), Some("from-b".to_string()));
    }

    #[test]
    fn test_corrupt_file_degrades_to_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, "{{{not json").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_unwritable_path_does_not_panic() {
        // A directory where the file should be makes every write fail.
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::create_dir_all(&path).unwrap();

        let store = FileStore::new(&path);
        store.set("k", "v");
        store.delete("k");
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_set_preserves_other_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("profile.json"));

        store.set("auth_session", "s");
        store.set("auth_rate_limit", "r");
        store.delete("auth_session");
        assert_eq!(store.get("auth_rate_limit"), Some("r".to_string()));
    }
}
