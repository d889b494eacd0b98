//! Failed-login counting and account lockout.
//!
//! The transition itself is a pure function over [`LoginState`]. Record stores
//! apply it inside a serialized read-modify-write on the user row so that
//! concurrent attempts cannot lose updates.

/// Result of a single password check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    Failure,
}

/// Per-account login bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoginState {
    pub failed_attempts: u32,
    pub locked: bool,
}

/// A login state change applied by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginTransition {
    pub before: LoginState,
    pub after: LoginState,
}

impl LoginTransition {
    /// Whether this attempt is the one that locked the account.
    #[must_use]
    pub const fn just_locked(&self) -> bool {
        !self.before.locked && self.after.locked
    }

    /// Whether the attempt must be refused with a lockout error.
    ///
    /// An attempt that reached an already locked account is refused
    /// whatever its outcome. A success that left the account locked is too.
    #[must_use]
    pub const fn locked_out(&self, outcome: LoginOutcome) -> bool {
        self.before.locked || (matches!(outcome, LoginOutcome::Success) && self.after.locked)
    }
}

/// Lockout threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_attempts: u32,
}

impl LockoutPolicy {
    /// Default number of consecutive failures before an account is locked.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// Create a policy. A threshold of zero is treated as one.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        let max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        Self { max_attempts }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Compute the state after one login attempt.
    ///
    /// A locked account stays locked whatever the outcome. Only an
    /// administrative unlock leaves that state.
    #[must_use]
    pub const fn apply(&self, state: LoginState, outcome: LoginOutcome) -> LoginState {
        if state.locked {
            return state;
        }

        match outcome {
            LoginOutcome::Success => LoginState {
                failed_attempts: 0,
                locked: false,
            },
            LoginOutcome::Failure => {
                let failed_attempts = state.failed_attempts.saturating_add(1);
                LoginState {
                    failed_attempts,
                    locked: failed_attempts >= self.max_attempts,
                }
            }
        }
    }

    /// Apply an outcome and pair it with the prior state.
    #[must_use]
    pub const fn transition(&self, state: LoginState, outcome: LoginOutcome) -> LoginTransition {
        LoginTransition {
            before: state,
            after: self.apply(state, outcome),
        }
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}
