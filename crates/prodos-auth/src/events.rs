//! Security event reporting.
//!
//! Login outcomes, lockouts, and session lifecycle changes are reported as
//! structured events for audit and observability. Delivery is fire-and-forget:
//! a sink that drops an event must never affect the auth flow.

use serde::Serialize;

/// A security-relevant event produced by the auth subsystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecurityEvent {
    /// A login attempt succeeded and the failure counter was reset.
    LoginSuccess,
    /// A login attempt failed.
    LoginFailed { attempts: u32, remaining: u32 },
    /// Consecutive failures reached the limit and a lockout began.
    AccountLocked { attempts: u32, locked_until: i64 },
    /// A local session record was written after a successful login.
    SessionCreated { identity: String, expires_at: i64 },
    /// An existing remote session was restored at startup.
    SessionRestored { identity: String },
    /// A local session was found past its expiry and purged.
    SessionExpired { identity: String },
    /// The user signed out.
    Logout,
    /// A shared-secret (fallback) login succeeded.
    FallbackLoginSuccess,
}

/// Consumer of security events.
pub trait SecurityEventSink: Send + Sync {
    /// Record an event. Best-effort; must not block or fail the caller.
    fn record(&self, event: SecurityEvent);
}

/// Sink that emits each event as one structured log line with a generated
/// event id, which is what the hosted audit pipeline ingests.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl SecurityEventSink for TracingEventSink {
    fn record(&self, event: SecurityEvent) {
        let event_id = uuid::Uuid::new_v4();
        match serde_json::to_string(&event) {
            Ok(payload) => {
                tracing::info!(event_id = %event_id, event = %payload, "security event");
            }
            Err(e) => {
                tracing::warn!(event_id = %event_id, error = %e, "security event serialization failed");
            }
        }
    }
}

/// Recording sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: std::sync::Mutex<Vec<SecurityEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events in order.
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl SecurityEventSink for MemorySink {
    fn record(&self, event: SecurityEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
