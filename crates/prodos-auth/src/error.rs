//! Auth error taxonomy.
//!
//! Every failure that reaches a caller of [`crate::AuthController`] is one of
//! these variants. Storage trouble never appears here: the persistence layer
//! degrades to "not authenticated" below this boundary (see `prodos-storage`).

use thiserror::Error;

/// Error type for authentication operations.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login attempted while locked out. Recoverable by waiting.
    #[error("Too many failed login attempts. Try again in {remaining_secs} seconds")]
    RateLimited {
        /// Whole seconds until the lockout ends (rounded up).
        remaining_secs: i64,
    },

    /// The provider rejected the identifier/secret pair. Counts against the
    /// lockout budget.
    #[error("{message} ({remaining_attempts} attempts remaining)")]
    Credentials {
        /// Provider-supplied rejection message.
        message: String,
        /// Attempts left before lockout.
        remaining_attempts: u32,
    },

    /// Network or service failure from the identity provider. Also counts
    /// against the lockout budget so repeated outages cannot be used to
    /// bypass rate limiting.
    #[error("Identity service error: {0}")]
    Provider(String),

    /// The local session passed its expiry. Recovered by a fresh login.
    #[error("Session expired, please sign in again")]
    SessionExpired,
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
