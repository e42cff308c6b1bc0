//! In-memory store for tests and ephemeral environments.

use crate::PersistentStore;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory [`PersistentStore`]. Not durable; useful for unit tests and
/// environments without a writable profile directory.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.insert(key.to_string(), value.to_string());
    }

    fn delete(&self, key: &str) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();

        store.set("test_key", "test_value");
        assert_eq!(store.get("test_key"), Some("test_value".to_string()));
        assert!(store.has("test_key"));
        assert!(!store.has("nonexistent"));

        store.delete("test_key");
        assert_eq!(store.get("test_key"), None);
    }
}
