//! Lockout Policy
//!
//! Tracks consecutive failed logins and explicit, time-boxed locks.
//!
//! Every write is a targeted change applied to the stored row, so a login
//! recording its outcome cannot undo an administrative lock or password
//! reset that landed after the account was read. The caller's copy is
//! replaced with the stored state after each write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::AccountId;

use crate::application::config::AuthConfig;
use crate::domain::entity::{account::Account, account_change::AccountChange};
use crate::domain::repository::AccountRepository;
use crate::error::{AuthError, AuthResult};

pub struct LockoutPolicy<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> LockoutPolicy<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    /// Count a failed attempt.
    ///
    /// Locks automatically only when `lockout.max_failed_attempts` is
    /// configured and the stored counter reaches it while no lock is
    /// active. An existing lock is never shortened or cleared.
    pub async fn record_failure(&self, account: &mut Account, now: DateTime<Utc>) -> AuthResult<()> {
        *account = self
            .repo
            .apply_change(&account.account_id, AccountChange::FailedAttempt, now)
            .await?;

        let threshold_reached = self
            .config
            .lockout
            .max_failed_attempts
            .is_some_and(|max| account.failed_attempts >= max);

        if threshold_reached && !account.is_locked(now) {
            let duration = chrono::Duration::from_std(self.config.lockout.lock_duration)
                .map_err(|e| AuthError::Internal(format!("Invalid lock duration: {}", e)))?;
            let until = now + duration;
            *account = self
                .repo
                .apply_change(&account.account_id, AccountChange::LockIfUnlocked(until), now)
                .await?;

            if account.locked_until == Some(until) {
                tracing::warn!(
                    username = %account.username,
                    failed_attempts = account.failed_attempts,
                    locked_until = %until,
                    "Account locked after repeated login failures"
                );
            }
        }

        Ok(())
    }

    pub async fn record_success(&self, account: &mut Account, now: DateTime<Utc>) -> AuthResult<()> {
        *account = self
            .repo
            .apply_change(&account.account_id, AccountChange::LoginSucceeded, now)
            .await?;
        Ok(())
    }

    /// Lock until `until`, which must be after `now`.
    ///
    /// `reason` is only logged.
    pub async fn lock(
        &self,
        account_id: &AccountId,
        until: DateTime<Utc>,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> AuthResult<Account> {
        let account = self
            .repo
            .apply_change(account_id, AccountChange::Lock(until), now)
            .await?;

        tracing::info!(
            username = %account.username,
            locked_until = %until,
            reason = reason.unwrap_or("-"),
            "Account locked"
        );
        Ok(account)
    }

    pub async fn unlock(&self, account_id: &AccountId, now: DateTime<Utc>) -> AuthResult<Account> {
        let account = self
            .repo
            .apply_change(account_id, AccountChange::Unlock, now)
            .await?;

        tracing::info!(username = %account.username, "Account unlocked");
        Ok(account)
    }
}
