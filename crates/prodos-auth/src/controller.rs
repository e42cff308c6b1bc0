//! Auth controller: orchestrates login, logout, session validation and
//! extension, and exposes observable authentication state.
//!
//! Built once by the application's composition root with its collaborators
//! injected (store-backed session and rate-limit state, a provider strategy,
//! an event sink). Nothing here blocks beyond provider I/O, and no error
//! escapes the public methods except the [`AuthError`] taxonomy.

use crate::error::{AuthError, AuthResult};
use crate::events::{SecurityEvent, SecurityEventSink};
use crate::machine::{AuthInput, AuthMachine, AuthState};
use crate::provider::{AuthChange, AuthProvider};
use crate::rate_limit::{AttemptOutcome, RateLimiter};
use crate::session::{SessionLoad, SessionProvider, SessionRecord, SessionStore};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Observable authentication state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    /// Whether a login or restore has completed and not ended.
    pub authenticated: bool,
    /// The authenticated principal, if any.
    pub identity: Option<String>,
    /// Which provider authenticated the session, if any.
    pub provider: Option<SessionProvider>,
    /// Session expiry as epoch milliseconds, if any.
    pub expires_at: Option<i64>,
    /// Whether the login path is locked out.
    pub locked: bool,
    /// Whole seconds until the lockout ends; 0 if not locked.
    pub remaining_lockout_secs: i64,
    /// Login attempts left before lockout.
    pub remaining_attempts: u32,
}

struct Inner {
    machine: Mutex<AuthMachine>,
    sessions: SessionStore,
    limiter: RateLimiter,
    provider: Arc<dyn AuthProvider>,
    events: Arc<dyn SecurityEventSink>,
    mirror_spawned: AtomicBool,
}

/// Orchestrates the authentication session.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AuthController {
    inner: Arc<Inner>,
}

impl AuthController {
    pub fn new(
        sessions: SessionStore,
        limiter: RateLimiter,
        provider: Arc<dyn AuthProvider>,
        events: Arc<dyn SecurityEventSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                machine: Mutex::new(AuthMachine::new()),
                sessions,
                limiter,
                provider,
                events,
                mirror_spawned: AtomicBool::new(false),
            }),
        }
    }

    /// Restore any existing session at startup and start mirroring the
    /// provider's own sign-in/sign-out notifications.
    ///
    /// Never fails: provider trouble is logged and leaves the controller
    /// unauthenticated.
    pub async fn initialize(&self) {
        match self.inner.provider.current_session().await {
            Ok(Some(provider_session)) => {
                let record = self.inner.sessions.save(
                    &provider_session.identity,
                    &provider_session.principal_id,
                    self.inner.provider.kind(),
                );
                self.consume(AuthInput::SessionRestored);
                tracing::info!(identity = %record.identity, "Restored remote session");
                self.inner.events.record(SecurityEvent::SessionRestored {
                    identity: record.identity,
                });
            }
            Ok(None) => {
                // No remote session; a still-valid local record from a
                // previous run (e.g. a shared-secret session) is adopted.
                if let Some(record) = self.check_session() {
                    self.consume(AuthInput::SessionRestored);
                    tracing::debug!(identity = %record.identity, "Adopted existing local session");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session restore failed");
                self.inner.sessions.clear();
            }
        }

        self.spawn_change_mirror();
    }

    /// Attempt a login.
    ///
    /// While locked out, the provider is never contacted and the lockout
    /// error carries the remaining wait. A failure counts against the
    /// lockout budget whether it was a rejection or a provider outage.
    pub async fn login(&self, identifier: &str, secret: &str) -> AuthResult<AuthStatus> {
        if self.inner.limiter.is_locked() {
            let remaining_secs = self.inner.limiter.remaining_lockout_secs();
            tracing::warn!(remaining_secs, "Login rejected while locked out");
            return Err(AuthError::RateLimited { remaining_secs });
        }

        self.consume(AuthInput::LoginStarted);

        match self.inner.provider.sign_in(identifier, secret).await {
            Ok(provider_session) => {
                self.inner.limiter.record_attempt(true);
                let record = self.inner.sessions.save(
                    &provider_session.identity,
                    &provider_session.principal_id,
                    self.inner.provider.kind(),
                );
                self.consume(AuthInput::LoginSucceeded);
                self.inner.events.record(SecurityEvent::SessionCreated {
                    identity: record.identity.clone(),
                    expires_at: record.expires_at,
                });
                if self.inner.provider.kind() == SessionProvider::Fallback {
                    self.inner.events.record(SecurityEvent::FallbackLoginSuccess);
                }
                Ok(self.status())
            }
            Err(e) => {
                let outcome = self.inner.limiter.record_attempt(false);
                self.consume(AuthInput::LoginFailed);
                match (outcome, e) {
                    // This failure tripped the lockout; the lockout message
                    // supersedes the provider's.
                    (AttemptOutcome::LockedOut { .. }, _) => Err(AuthError::RateLimited {
                        remaining_secs: self.inner.limiter.remaining_lockout_secs(),
                    }),
                    (
                        AttemptOutcome::Failed { remaining, .. },
                        AuthError::Credentials { message, .. },
                    ) => Err(AuthError::Credentials {
                        message,
                        remaining_attempts: remaining,
                    }),
                    (_, other) => Err(other),
                }
            }
        }
    }

    /// Sign out: best-effort remote sign-out, then clear local state.
    pub async fn logout(&self) {
        if let Err(e) = self.inner.provider.sign_out().await {
            tracing::warn!(error = %e, "Remote sign-out failed");
        }
        self.inner.sessions.clear();
        self.consume(AuthInput::LoggedOut);
        self.inner.events.record(SecurityEvent::Logout);
    }

    /// Check the local session without any provider I/O. Cheap enough to run
    /// on every navigation.
    ///
    /// `Ok(true)`: an active session exists. `Ok(false)`: no session.
    /// `Err(SessionExpired)`: a session just passed its expiry; it has been
    /// purged and the expiry reported.
    pub fn validate_session(&self) -> AuthResult<bool> {
        match self.inner.sessions.load() {
            SessionLoad::Active(_) => Ok(true),
            SessionLoad::Absent => {
                self.ensure_unauthenticated();
                Ok(false)
            }
            SessionLoad::Expired(record) => {
                self.consume(AuthInput::SessionExpired);
                tracing::info!(identity = %record.identity, "Session expired");
                self.inner.events.record(SecurityEvent::SessionExpired {
                    identity: record.identity,
                });
                Err(AuthError::SessionExpired)
            }
        }
    }

    /// Push the session expiry forward in response to user activity.
    /// No-op unless authenticated.
    pub fn extend_session(&self) -> Option<SessionRecord> {
        if !self.is_authenticated() {
            return None;
        }
        let extended = self.inner.sessions.extend();
        if let Some(record) = &extended {
            tracing::debug!(expires_at = record.expires_at, "Session extended");
        }
        extended
    }

    /// Whether a login or restore has completed and not ended.
    pub fn is_authenticated(&self) -> bool {
        let machine = self.machine();
        machine.state() == &AuthState::Authenticated
    }

    /// Current observable state, including the lockout qualifier.
    pub fn status(&self) -> AuthStatus {
        let record = self.check_session();
        AuthStatus {
            authenticated: self.is_authenticated(),
            identity: record.as_ref().map(|r| r.identity.clone()),
            provider: record.as_ref().map(|r| r.provider),
            expires_at: record.as_ref().map(|r| r.expires_at),
            locked: self.inner.limiter.is_locked(),
            remaining_lockout_secs: self.inner.limiter.remaining_lockout_secs(),
            remaining_attempts: self.inner.limiter.remaining_attempts(),
        }
    }

    /// Read the session record, reconciling the state machine with what
    /// storage actually holds (another process may have logged out, or the
    /// record may have expired).
    fn check_session(&self) -> Option<SessionRecord> {
        match self.inner.sessions.load() {
            SessionLoad::Active(record) => Some(record),
            SessionLoad::Absent => {
                self.ensure_unauthenticated();
                None
            }
            SessionLoad::Expired(record) => {
                self.consume(AuthInput::SessionExpired);
                tracing::info!(identity = %record.identity, "Session expired");
                self.inner.events.record(SecurityEvent::SessionExpired {
                    identity: record.identity,
                });
                None
            }
        }
    }

    fn ensure_unauthenticated(&self) {
        if self.is_authenticated() {
            self.consume(AuthInput::LoggedOut);
        }
    }

    fn machine(&self) -> std::sync::MutexGuard<'_, AuthMachine> {
        self.inner.machine.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Feed the state machine, ignoring inputs impossible in the current
    /// state (e.g. a mirrored sign-out racing a local one).
    fn consume(&self, input: AuthInput) {
        let mut machine = self.machine();
        if machine.consume(&input).is_err() {
            tracing::debug!(
                input = ?input,
                state = ?machine.state(),
                "Ignoring impossible auth transition"
            );
        }
    }

    /// Mirror the provider's sign-in/sign-out notifications into local
    /// session state. Spawned once.
    fn spawn_change_mirror(&self) {
        if self.inner.mirror_spawned.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut rx = self.inner.provider.subscribe();
        let controller = self.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AuthChange::SignedIn(provider_session)) => {
                        let record = controller.inner.sessions.save(
                            &provider_session.identity,
                            &provider_session.principal_id,
                            controller.inner.provider.kind(),
                        );
                        controller.consume(AuthInput::SessionRestored);
                        tracing::debug!(identity = %record.identity, "Mirrored provider sign-in");
                    }
                    Ok(AuthChange::SignedOut) => {
                        controller.inner.sessions.clear();
                        controller.consume(AuthInput::LoggedOut);
                        tracing::debug!("Mirrored provider sign-out");
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth change stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
