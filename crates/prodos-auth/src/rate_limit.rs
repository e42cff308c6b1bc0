//! Login rate limiting with timed lockout.
//!
//! Tracks consecutive failed login attempts in a single persisted record and
//! locks the login path for a fixed window once the budget is exhausted.
//! Lockout expiry is lazy: the next read that observes a passed deadline
//! resets the record. There is no background timer.
//!
//! Known limitation: `record_attempt` is a read-modify-write over shared
//! profile storage, so two concurrent clients of the same profile can race
//! and under-count an attacker's attempts (last writer wins). Cross-process
//! locking is intentionally not used here.

use crate::clock::Clock;
use crate::events::{SecurityEvent, SecurityEventSink};
use prodos_storage::{PersistentStore, StorageKeys};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Persisted rate-limit state (`auth_rate_limit` key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    /// Consecutive failures since the last success or lockout reset.
    pub attempts: u32,
    /// Lockout deadline as epoch milliseconds, if locked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<i64>,
}

impl RateLimitRecord {
    fn reset() -> Self {
        Self {
            attempts: 0,
            locked_until: None,
        }
    }
}

/// Rate-limiting policy values.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Consecutive failures allowed before lockout.
    pub max_attempts: u32,
    /// How long the login path stays locked.
    pub lockout: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout: Duration::from_secs(15 * 60),
        }
    }
}

/// Outcome of recording a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Success: the failure counter was reset.
    Reset,
    /// A failure below the lockout threshold.
    Failed { attempts: u32, remaining: u32 },
    /// The failure that tripped the lockout.
    LockedOut { attempts: u32, locked_until: i64 },
}

/// Tracks failed login attempts and the lockout window.
pub struct RateLimiter {
    store: Arc<dyn PersistentStore>,
    clock: Arc<dyn Clock>,
    policy: RateLimitPolicy,
    events: Arc<dyn SecurityEventSink>,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        clock: Arc<dyn Clock>,
        policy: RateLimitPolicy,
        events: Arc<dyn SecurityEventSink>,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            events,
        }
    }

    /// Read the current record, applying lazy lockout expiry: a deadline in
    /// the past resets the record (persisted) before it is returned.
    fn read(&self) -> RateLimitRecord {
        let record = match self.store.get(StorageKeys::AUTH_RATE_LIMIT) {
            Some(raw) => match serde_json::from_str::<RateLimitRecord>(&raw) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable rate-limit record, resetting");
                    RateLimitRecord::reset()
                }
            },
            None => RateLimitRecord::reset(),
        };

        if let Some(locked_until) = record.locked_until {
            if locked_until <= self.clock.now_ms() {
                tracing::info!("Login lockout expired, resetting attempt counter");
                let reset = RateLimitRecord::reset();
                self.write(&reset);
                return reset;
            }
        }

        record
    }

    fn write(&self, record: &RateLimitRecord) {
        match serde_json::to_string(record) {
            Ok(raw) => self.store.set(StorageKeys::AUTH_RATE_LIMIT, &raw),
            Err(e) => tracing::warn!(error = %e, "Failed to encode rate-limit record"),
        }
    }

    /// Whether the login path is currently locked.
    pub fn is_locked(&self) -> bool {
        self.read().locked_until.is_some()
    }

    /// Whole seconds until the lockout ends (rounded up); 0 if not locked.
    pub fn remaining_lockout_secs(&self) -> i64 {
        match self.read().locked_until {
            Some(locked_until) => {
                let remaining_ms = locked_until - self.clock.now_ms();
                ((remaining_ms + 999) / 1000).max(0)
            }
            None => 0,
        }
    }

    /// Attempts left before lockout.
    pub fn remaining_attempts(&self) -> u32 {
        self.policy.max_attempts.saturating_sub(self.read().attempts)
    }

    /// Record the outcome of a login attempt.
    ///
    /// Success resets the counter; a failure increments it, and the failure
    /// that reaches the limit starts the lockout window.
    pub fn record_attempt(&self, success: bool) -> AttemptOutcome {
        if success {
            self.write(&RateLimitRecord::reset());
            self.events.record(SecurityEvent::LoginSuccess);
            return AttemptOutcome::Reset;
        }

        let mut record = self.read();
        record.attempts += 1;

        if record.attempts >= self.policy.max_attempts {
            let locked_until = self.clock.now_ms() + self.policy.lockout.as_millis() as i64;
            record.locked_until = Some(locked_until);
            self.write(&record);
            tracing::warn!(
                attempts = record.attempts,
                locked_until = locked_until,
                "Login locked out after repeated failures"
            );
            self.events.record(SecurityEvent::AccountLocked {
                attempts: record.attempts,
                locked_until,
            });
            AttemptOutcome::LockedOut {
                attempts: record.attempts,
                locked_until,
            }
        } else {
            self.write(&record);
            let remaining = self.policy.max_attempts - record.attempts;
            tracing::info!(
                attempts = record.attempts,
                remaining = remaining,
                "Login attempt failed"
            );
            self.events.record(SecurityEvent::LoginFailed {
                attempts: record.attempts,
                remaining,
            });
            AttemptOutcome::Failed {
                attempts: record.attempts,
                remaining,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::MemorySink;
    use chrono::Utc;
    use prodos_storage::MemoryStore;

    fn limiter() -> (RateLimiter, Arc<ManualClock>, Arc<MemorySink>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sink = Arc::new(MemorySink::new());
        let limiter = RateLimiter::new(
            store.clone(),
            clock.clone(),
            RateLimitPolicy::default(),
            sink.clone(),
        );
        (limiter, clock, sink, store)
    }

    #[test]
    fn fresh_state_is_unlocked_with_full_budget() {
        let (limiter, _, _, _) = limiter();
        assert!(!limiter.is_locked());
        assert_eq!(limiter.remaining_attempts(), 5);
        assert_eq!(limiter.remaining_lockout_secs(), 0);
    }

    #[test]
    fn fifth_failure_triggers_lockout() {
        let (limiter, clock, sink, _) = limiter();

        for i in 1..=4 {
            let outcome = limiter.record_attempt(false);
            assert_eq!(
                outcome,
                AttemptOutcome::Failed {
                    attempts: i,
                    remaining: 5 - i
                }
            );
        }
        assert!(!limiter.is_locked());

        let outcome = limiter.record_attempt(false);
        let expected_deadline = clock.now_ms() + 15 * 60 * 1000;
        assert_eq!(
            outcome,
            AttemptOutcome::LockedOut {
                attempts: 5,
                locked_until: expected_deadline
            }
        );
        assert!(limiter.is_locked());
        assert_eq!(limiter.remaining_lockout_secs(), 900);
        assert_eq!(limiter.remaining_attempts(), 0);

        let events = sink.events();
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[4],
            SecurityEvent::AccountLocked {
                attempts: 5,
                locked_until: expected_deadline
            }
        );
    }

    #[test]
    fn remaining_lockout_decreases_and_rounds_up() {
        let (limiter, clock, _, _) = limiter();
        for _ in 0..5 {
            limiter.record_attempt(false);
        }

        assert_eq!(limiter.remaining_lockout_secs(), 900);
        clock.advance_secs(1);
        assert_eq!(limiter.remaining_lockout_secs(), 899);

        // A partial second still counts as a whole remaining second.
        clock.advance(Duration::from_millis(500));
        assert_eq!(limiter.remaining_lockout_secs(), 899);
        clock.advance(Duration::from_millis(500));
        assert_eq!(limiter.remaining_lockout_secs(), 898);
    }

    #[test]
    fn lockout_expires_lazily() {
        let (limiter, clock, _, store) = limiter();
        for _ in 0..5 {
            limiter.record_attempt(false);
        }
        assert!(limiter.is_locked());

        clock.advance_secs(15 * 60);
        assert!(!limiter.is_locked());
        assert_eq!(limiter.remaining_attempts(), 5);
        assert_eq!(limiter.remaining_lockout_secs(), 0);

        // The reset was persisted, not just computed.
        let raw = store.get(StorageKeys::AUTH_RATE_LIMIT).unwrap();
        let record: RateLimitRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record, RateLimitRecord::reset());
    }

    #[test]
    fn success_resets_counter_below_lockout() {
        let (limiter, _, sink, _) = limiter();
        for _ in 0..3 {
            limiter.record_attempt(false);
        }
        assert_eq!(limiter.remaining_attempts(), 2);

        assert_eq!(limiter.record_attempt(true), AttemptOutcome::Reset);
        assert!(!limiter.is_locked());
        assert_eq!(limiter.remaining_attempts(), 5);
        assert_eq!(sink.events().last(), Some(&SecurityEvent::LoginSuccess));
    }

    #[test]
    fn corrupt_record_resets_instead_of_failing() {
        let (limiter, _, _, store) = limiter();
        store.set(StorageKeys::AUTH_RATE_LIMIT, "not json");

        assert!(!limiter.is_locked());
        assert_eq!(limiter.remaining_attempts(), 5);
    }

    #[test]
    fn custom_policy_is_respected() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = RateLimiter::new(
            store,
            clock.clone(),
            RateLimitPolicy {
                max_attempts: 2,
                lockout: Duration::from_secs(60),
            },
            Arc::new(MemorySink::new()),
        );

        limiter.record_attempt(false);
        let outcome = limiter.record_attempt(false);
        assert!(matches!(outcome, AttemptOutcome::LockedOut { attempts: 2, .. }));
        assert_eq!(limiter.remaining_lockout_secs(), 60);
    }

    #[test]
    fn record_wire_format_is_camel_case() {
        let record = RateLimitRecord {
            attempts: 3,
            locked_until: Some(42),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"attempts":3,"lockedUntil":42}"#);

        let unlocked = RateLimitRecord::reset();
        assert_eq!(serde_json::to_string(&unlocked).unwrap(), r#"{"attempts":0}"#);
    }
}
