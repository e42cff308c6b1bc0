//! Storage trait definitions.

/// Trait for durable per-profile key-value stores.
///
/// Operations are synchronous and infallible from the caller's perspective:
/// a failing backend degrades (absent reads, dropped writes) rather than
/// surfacing an error. Concurrent writers from other processes of the same
/// profile are tolerated with last-writer-wins semantics per key.
pub trait PersistentStore: Send + Sync {
    /// Retrieve a value, or `None` if absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value. Best-effort; failures are logged, not returned.
    fn set(&self, key: &str, value: &str);

    /// Delete a value. Best-effort; failures are logged, not returned.
    fn delete(&self, key: &str);

    /// Check if a key exists.
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
