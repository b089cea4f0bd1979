//! Verify Credentials Use Case
//!
//! Checks a username/password pair against stored account state. The
//! outcome keeps the precise failure reason (and the account, if one was
//! found) so the caller can record the attempt before collapsing the
//! reason into a generic error.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::config::AuthConfig;
use crate::domain::entity::account::Account;
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::{user_name::UserName, user_password::RawPassword};
use crate::error::AuthResult;

/// Why a credential check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureReason {
    NoSuchAccount,
    Disabled,
    EmailNotVerified,
    Locked,
    BadPassword,
}

#[derive(Debug)]
pub enum VerifyOutcome {
    Verified(Account),
    Rejected {
        reason: AuthFailureReason,
        /// Present for every reason except `NoSuchAccount`
        account: Option<Account>,
    },
}

pub struct VerifyCredentialsUseCase<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> VerifyCredentialsUseCase<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    /// Run the checks in order: exists, enabled, email verified, not
    /// locked, password matches. The first failing check wins.
    pub async fn execute(
        &self,
        username: &str,
        password: RawPassword,
        now: DateTime<Utc>,
    ) -> AuthResult<VerifyOutcome> {
        // A string that cannot be a username cannot name an account.
        let Ok(username) = UserName::new(username) else {
            return Ok(rejected(AuthFailureReason::NoSuchAccount, None));
        };

        let Some(account) = self.repo.find_by_username(&username).await? else {
            return Ok(rejected(AuthFailureReason::NoSuchAccount, None));
        };

        let reason = if !account.enabled {
            Some(AuthFailureReason::Disabled)
        } else if !account.email_verified {
            Some(AuthFailureReason::EmailNotVerified)
        } else if account.is_locked(now) {
            Some(AuthFailureReason::Locked)
        } else if !account
            .password_hash
            .verify(&password, self.config.pepper())
        {
            Some(AuthFailureReason::BadPassword)
        } else {
            None
        };

        Ok(match reason {
            Some(reason) => rejected(reason, Some(account)),
            None => VerifyOutcome::Verified(account),
        })
    }
}

fn rejected(reason: AuthFailureReason, account: Option<Account>) -> VerifyOutcome {
    VerifyOutcome::Rejected { reason, account }
}
