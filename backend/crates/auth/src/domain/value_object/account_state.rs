//! Account State
//!
//! The lifecycle state of an account as seen by authentication. Derived
//! from the stored flags at a given instant, never persisted: a lock
//! expires lazily the first time it is observed with `now >= until`.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    /// Email not yet verified
    Unverified,
    /// Enabled, verified and not locked
    Active,
    Disabled,
    /// Explicitly locked until the given instant
    Locked(DateTime<Utc>),
}

impl AccountState {
    /// Resolve the state from stored flags.
    ///
    /// Precedence follows the login checks: disabled, then unverified,
    /// then locked.
    pub fn resolve(
        enabled: bool,
        email_verified: bool,
        locked_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if !enabled {
            return Self::Disabled;
        }
        if !email_verified {
            return Self::Unverified;
        }
        match locked_until {
            Some(until) if until > now => Self::Locked(until),
            _ => Self::Active,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}
