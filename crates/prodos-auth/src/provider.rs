//! Login provider strategies.
//!
//! Which strategy a deployment uses is decided once by the composition root
//! and injected into the controller; it is never chosen per call.

use crate::error::{AuthError, AuthResult};
use crate::session::SessionProvider;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Synthetic identity used by shared-secret logins.
pub const FALLBACK_IDENTITY: &str = "local-admin";

/// A session reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    /// Stable identifier from the provider.
    pub principal_id: String,
    /// The authenticated principal (e.g. email).
    pub identity: String,
}

/// Provider-originated session change notification.
#[derive(Debug, Clone)]
pub enum AuthChange {
    SignedIn(ProviderSession),
    SignedOut,
}

/// A login strategy.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Which provider kind sessions from this strategy carry.
    fn kind(&self) -> SessionProvider;

    /// Verify credentials and return the resulting session.
    async fn sign_in(&self, identifier: &str, secret: &str) -> AuthResult<ProviderSession>;

    /// Report an existing remote session, if the provider has one.
    async fn current_session(&self) -> AuthResult<Option<ProviderSession>>;

    /// End the remote session, if any.
    async fn sign_out(&self) -> AuthResult<()>;

    /// Subscribe to the provider's own sign-in/sign-out notifications.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// Shared-secret login for deployments without a managed identity backend.
///
/// Succeeds iff the supplied secret equals the configured value. There is no
/// remote session: persistence comes entirely from the local session record.
pub struct FallbackProvider {
    shared_secret: String,
    changes: broadcast::Sender<AuthChange>,
}

impl FallbackProvider {
    pub fn new(shared_secret: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(8);
        Self {
            shared_secret: shared_secret.into(),
            changes,
        }
    }
}

#[async_trait]
impl AuthProvider for FallbackProvider {
    fn kind(&self) -> SessionProvider {
        SessionProvider::Fallback
    }

    async fn sign_in(&self, _identifier: &str, secret: &str) -> AuthResult<ProviderSession> {
        if secret == self.shared_secret {
            Ok(ProviderSession {
                principal_id: FALLBACK_IDENTITY.to_string(),
                identity: FALLBACK_IDENTITY.to_string(),
            })
        } else {
            Err(AuthError::Credentials {
                message: "Incorrect password".to_string(),
                remaining_attempts: 0,
            })
        }
    }

    async fn current_session(&self) -> AuthResult<Option<ProviderSession>> {
        Ok(None)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }
}
