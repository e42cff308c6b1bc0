//! Authentication state machine.
//!
//! `Locked` is a derived qualifier over `Unauthenticated` (asked of the rate
//! limiter), not a machine state, so it never appears here.

use rust_fsm::state_machine;

state_machine! {
    /// Client authentication states and the inputs that move between them.
    #[derive(Debug, Clone, PartialEq)]
    pub auth_machine(Unauthenticated)

    Unauthenticated => {
        LoginStarted => Authenticating,
        SessionRestored => Authenticated
    },
    Authenticating => {
        LoginSucceeded => Authenticated,
        LoginFailed => Unauthenticated
    },
    Authenticated => {
        LoggedOut => Unauthenticated,
        SessionExpired => Unauthenticated
    }
}

/// The auth state machine.
pub type AuthMachine = rust_fsm::StateMachine<auth_machine::Impl>;

pub use auth_machine::{Input as AuthInput, State as AuthState};
