//! Account Entity
//!
//! The authentication principal: credentials, lifecycle flags and the
//! failed-login counter. Personal data lives in a profile record owned by
//! another bounded context.
//!
//! Every mutator takes `now` explicitly so that lock windows and expiry
//! can be exercised deterministically.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, RoleId};

use crate::domain::entity::account_change::{AccountChange, AccountEdit};
use crate::domain::entity::role::Role;
use crate::domain::value_object::{
    account_state::AccountState, user_name::UserName, user_password::UserPassword,
};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone)]
pub struct Account {
    pub account_id: AccountId,
    /// Unique, case-sensitive, immutable
    pub username: UserName,
    pub password_hash: UserPassword,
    pub email_verified: bool,
    pub enabled: bool,
    pub last_login: Option<DateTime<Utc>>,
    /// Consecutive failed logins since the last success or unlock
    pub failed_attempts: u32,
    /// A past value means the lock has expired
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub roles: Vec<Role>,
}

impl Account {
    /// New accounts start enabled, unverified, with no failures.
    pub fn new(
        username: UserName,
        password_hash: UserPassword,
        roles: Vec<Role>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: AccountId::new(),
            username,
            password_hash,
            email_verified: false,
            enabled: true,
            last_login: None,
            failed_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
            roles,
        }
    }

    pub fn state(&self, now: DateTime<Utc>) -> AccountState {
        AccountState::resolve(self.enabled, self.email_verified, self.locked_until, now)
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    pub fn role_names(&self) -> BTreeSet<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }

    pub fn role_ids(&self) -> Vec<RoleId> {
        self.roles.iter().map(|r| r.role_id).collect()
    }

    // ------------------------------------------------------------------------
    // Login outcomes
    // ------------------------------------------------------------------------

    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.updated_at = now;
    }

    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.failed_attempts = 0;
        self.last_login = Some(now);
        self.updated_at = now;
    }

    // ------------------------------------------------------------------------
    // Administrative transitions
    // ------------------------------------------------------------------------

    /// Lock until `until`. The window must end in the future; on error the
    /// account is left untouched.
    pub fn lock_until(&mut self, until: DateTime<Utc>, now: DateTime<Utc>) -> AuthResult<()> {
        if until <= now {
            return Err(AuthError::InvalidLockWindow);
        }
        self.locked_until = Some(until);
        self.updated_at = now;
        Ok(())
    }

    pub fn unlock(&mut self, now: DateTime<Utc>) {
        self.locked_until = None;
        self.failed_attempts = 0;
        self.updated_at = now;
    }

    pub fn verify_email(&mut self, now: DateTime<Utc>) {
        self.email_verified = true;
        self.updated_at = now;
    }

    pub fn set_enabled(&mut self, enabled: bool, now: DateTime<Utc>) {
        self.enabled = enabled;
        self.updated_at = now;
    }

    /// Replace the password. Also clears any lock and the failure counter.
    pub fn reset_password(&mut self, password_hash: UserPassword, now: DateTime<Utc>) {
        self.password_hash = password_hash;
        self.failed_attempts = 0;
        self.locked_until = None;
        self.updated_at = now;
    }

    // ------------------------------------------------------------------------
    // Stored changes
    // ------------------------------------------------------------------------

    /// Apply a targeted change. On error the account is left untouched.
    pub fn apply(&mut self, change: &AccountChange, now: DateTime<Utc>) -> AuthResult<()> {
        change.validate(now)?;
        match change {
            AccountChange::FailedAttempt => self.record_failure(now),
            AccountChange::LoginSucceeded => self.record_success(now),
            AccountChange::LockIfUnlocked(until) => {
                if !self.is_locked(now) {
                    self.lock_until(*until, now)?;
                }
            }
            AccountChange::Lock(until) => self.lock_until(*until, now)?,
            AccountChange::Unlock => self.unlock(now),
            AccountChange::VerifyEmail => self.verify_email(now),
            AccountChange::SetEnabled(enabled) => self.set_enabled(*enabled, now),
            AccountChange::ResetPassword(hash) => self.reset_password(hash.clone(), now),
        }
        Ok(())
    }

    pub fn apply_edit(&mut self, edit: &AccountEdit, now: DateTime<Utc>) -> AuthResult<()> {
        edit.validate()?;
        if let Some(hash) = &edit.password_hash {
            self.password_hash = hash.clone();
        }
        if let Some(enabled) = edit.enabled {
            self.enabled = enabled;
        }
        if let Some(email_verified) = edit.email_verified {
            self.email_verified = email_verified;
        }
        if let Some(roles) = &edit.roles {
            self.roles = roles.clone();
        }
        self.updated_at = now;
        Ok(())
    }
}
