//! Local session record persistence.
//!
//! One singleton record (`auth_session` key) holds the authenticated
//! identity, its provider, and an absolute expiry. Expiry is lazy: any read
//! that finds the deadline in the past purges the record and reports it as
//! expired, so no background timer is needed.

use crate::clock::Clock;
use prodos_storage::{PersistentStore, StorageKeys};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Which login strategy produced a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionProvider {
    /// The hosted identity service.
    Managed,
    /// The deployment-local shared-secret path.
    Fallback,
}

/// Persisted session state (`auth_session` key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// The authenticated principal (e.g. email).
    pub identity: String,
    /// Stable identifier from the provider.
    pub principal_id: String,
    /// Which provider authenticated this session.
    pub provider: SessionProvider,
    /// Absolute expiry as epoch milliseconds.
    pub expires_at: i64,
}

/// Result of reading the session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLoad {
    /// A session with expiry still in the future.
    Active(SessionRecord),
    /// A session found past its expiry. The record has been purged; the
    /// stale contents are returned so the caller can report who expired.
    Expired(SessionRecord),
    /// No session record.
    Absent,
}

/// Reads and writes the singleton session record.
pub struct SessionStore {
    store: Arc<dyn PersistentStore>,
    clock: Arc<dyn Clock>,
    session_duration: Duration,
}

impl SessionStore {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        clock: Arc<dyn Clock>,
        session_duration: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            session_duration,
        }
    }

    fn duration_ms(&self) -> i64 {
        self.session_duration.as_millis() as i64
    }

    /// Read the session record, purging it if expired.
    pub fn load(&self) -> SessionLoad {
        let raw = match self.store.get(StorageKeys::AUTH_SESSION) {
            Some(raw) => raw,
            None => return SessionLoad::Absent,
        };

        let record = match serde_json::from_str::<SessionRecord>(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable session record, purging");
                self.store.delete(StorageKeys::AUTH_SESSION);
                return SessionLoad::Absent;
            }
        };

        if record.expires_at <= self.clock.now_ms() {
            self.store.delete(StorageKeys::AUTH_SESSION);
            return SessionLoad::Expired(record);
        }

        SessionLoad::Active(record)
    }

    /// Write a fresh session record expiring one session-duration from now.
    pub fn save(
        &self,
        identity: &str,
        principal_id: &str,
        provider: SessionProvider,
    ) -> SessionRecord {
        let record = SessionRecord {
            identity: identity.to_string(),
            principal_id: principal_id.to_string(),
            provider,
            expires_at: self.clock.now_ms() + self.duration_ms(),
        };
        self.write(&record);
        record
    }

    /// Push the expiry of an active session forward, preserving identity and
    /// provider. Returns `None` (and writes nothing) when no active session
    /// exists.
    pub fn extend(&self) -> Option<SessionRecord> {
        match self.load() {
            SessionLoad::Active(mut record) => {
                record.expires_at = self.clock.now_ms() + self.duration_ms();
                self.write(&record);
                Some(record)
            }
            SessionLoad::Expired(_) | SessionLoad::Absent => None,
        }
    }

    /// Delete the session record.
    pub fn clear(&self) {
        self.store.delete(StorageKeys::AUTH_SESSION);
    }

    fn write(&self, record: &SessionRecord) {
        match serde_json::to_string(record) {
            Ok(raw) => self.store.set(StorageKeys::AUTH_SESSION, &raw),
            Err(e) => tracing::warn!(error = %e, "Failed to encode session record"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Utc;
    use prodos_storage::MemoryStore;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn sessions() -> (SessionStore, Arc<ManualClock>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = SessionStore::new(store.clone(), clock.clone(), DAY);
        (sessions, clock, store)
    }

    #[test]
    fn save_and_load_active_session() {
        let (sessions, clock, _) = sessions();

        let saved = sessions.save("a@x.com", "user-1", SessionProvider::Managed);
        assert_eq!(saved.expires_at, clock.now_ms() + 24 * 60 * 60 * 1000);

        match sessions.load() {
            SessionLoad::Active(record) => assert_eq!(record, saved),
            other => panic!("expected active session, got {other:?}"),
        }
    }

    #[test]
    fn expired_session_is_purged_on_read() {
        let (sessions, clock, store) = sessions();
        sessions.save("a@x.com", "user-1", SessionProvider::Managed);

        clock.advance(DAY);

        // Expiry exactly at now counts as expired.
        match sessions.load() {
            SessionLoad::Expired(record) => assert_eq!(record.identity, "a@x.com"),
            other => panic!("expected expired session, got {other:?}"),
        }
        assert!(store.get(StorageKeys::AUTH_SESSION).is_none());
        assert_eq!(sessions.load(), SessionLoad::Absent);
    }

    #[test]
    fn extend_pushes_expiry_and_preserves_identity() {
        let (sessions, clock, _) = sessions();
        sessions.save("a@x.com", "user-1", SessionProvider::Fallback);

        clock.advance_secs(3600);
        let extended = sessions.extend().unwrap();

        assert_eq!(extended.identity, "a@x.com");
        assert_eq!(extended.principal_id, "user-1");
        assert_eq!(extended.provider, SessionProvider::Fallback);
        assert_eq!(extended.expires_at, clock.now_ms() + 24 * 60 * 60 * 1000);
    }

    #[test]
    fn extend_without_session_writes_nothing() {
        let (sessions, _, store) = sessions();
        assert!(sessions.extend().is_none());
        assert!(store.get(StorageKeys::AUTH_SESSION).is_none());
    }

    #[test]
    fn clear_removes_record() {
        let (sessions, _, _) = sessions();
        sessions.save("a@x.com", "user-1", SessionProvider::Managed);
        sessions.clear();
        assert_eq!(sessions.load(), SessionLoad::Absent);
    }

    #[test]
    fn corrupt_record_is_purged() {
        let (sessions, _, store) = sessions();
        store.set(StorageKeys::AUTH_SESSION, "{broken");
        assert_eq!(sessions.load(), SessionLoad::Absent);
        assert!(store.get(StorageKeys::AUTH_SESSION).is_none());
    }

    #[test]
    fn record_wire_format_is_camel_case() {
        let record = SessionRecord {
            identity: "a@x.com".to_string(),
            principal_id: "user-1".to_string(),
            provider: SessionProvider::Managed,
            expires_at: 42,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"identity":"a@x.com","principalId":"user-1","provider":"managed","expiresAt":42}"#
        );
    }
}
