//! Account Changes
//!
//! Targeted writes to a stored account. A repository applies a change to
//! the row as it currently is, so a login recording its outcome never
//! writes back flags an administrator changed in the meantime.

use chrono::{DateTime, Utc};

use crate::domain::entity::role::Role;
use crate::domain::value_object::user_password::UserPassword;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone)]
pub enum AccountChange {
    /// `failed_attempts + 1`, saturating
    FailedAttempt,
    /// Reset the counter and stamp `last_login`
    LoginSucceeded,
    /// Lock until the instant unless a lock is already active
    LockIfUnlocked(DateTime<Utc>),
    Lock(DateTime<Utc>),
    /// Clear the lock and the counter
    Unlock,
    VerifyEmail,
    SetEnabled(bool),
    /// New password; also clears the lock and the counter
    ResetPassword(UserPassword),
}

impl AccountChange {
    /// Reject changes that can never apply, before touching storage.
    pub fn validate(&self, now: DateTime<Utc>) -> AuthResult<()> {
        match self {
            AccountChange::Lock(until) | AccountChange::LockIfUnlocked(until) if *until <= now => {
                Err(AuthError::InvalidLockWindow)
            }
            _ => Ok(()),
        }
    }
}

/// Administrative edit. `None` leaves a field as stored; the username is
/// immutable and not part of it.
#[derive(Debug, Clone, Default)]
pub struct AccountEdit {
    pub password_hash: Option<UserPassword>,
    pub enabled: Option<bool>,
    pub email_verified: Option<bool>,
    /// Replaces every role assignment when present; never empty
    pub roles: Option<Vec<Role>>,
}

impl AccountEdit {
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none()
            && self.enabled.is_none()
            && self.email_verified.is_none()
            && self.roles.is_none()
    }

    pub fn validate(&self) -> AuthResult<()> {
        if self.roles.as_ref().is_some_and(Vec::is_empty) {
            return Err(AuthError::Validation(
                "At least one role is required".to_string(),
            ));
        }
        Ok(())
    }
}
