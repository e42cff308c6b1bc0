//! Authentication for the ProductionOS admin client.
//!
//! This crate provides:
//! - Local session persistence with absolute expiry and activity-based extension
//! - Dual-provider login: managed identity service (Supabase Auth) or a
//!   deployment-local shared secret
//! - Login rate limiting with timed lockout (lazy expiry, no background timers)
//! - Explicit FSM-based auth state exposed to the rest of the application
//! - Structured security events for audit and observability

mod activity;
mod clock;
mod controller;
mod error;
mod events;
mod machine;
mod provider;
mod rate_limit;
mod session;
mod supabase;

pub use activity::ActivityWatcher;
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{AuthController, AuthStatus};
pub use error::{AuthError, AuthResult};
pub use events::{MemorySink, SecurityEvent, SecurityEventSink, TracingEventSink};
pub use machine::{auth_machine, AuthInput, AuthMachine, AuthState};
pub use provider::{AuthChange, AuthProvider, FallbackProvider, ProviderSession, FALLBACK_IDENTITY};
pub use rate_limit::{AttemptOutcome, RateLimitPolicy, RateLimitRecord, RateLimiter};
pub use session::{SessionLoad, SessionProvider, SessionRecord, SessionStore};
pub use supabase::ManagedProvider;
