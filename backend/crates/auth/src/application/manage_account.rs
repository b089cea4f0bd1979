//! Manage Account Use Case
//!
//! Administrative operations on existing accounts: lookups, listings,
//! edits, lifecycle flags, locks and password resets.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, RoleId};
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::application::create_account::{load_account, resolve_roles};
use crate::application::lockout::LockoutPolicy;
use crate::domain::entity::{
    account::Account,
    account_change::{AccountChange, AccountEdit},
};
use crate::domain::repository::{AccountRepository, RoleRepository};
use crate::domain::value_object::{
    page::{Page, PageRequest},
    user_name::UserName,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

/// Administrative edit of an existing account.
///
/// Every field is optional. A blank password and an empty role list are
/// treated as absent. A username equal to the stored one is accepted; any
/// other username is rejected because usernames never change.
#[derive(Debug, Default)]
pub struct UpdateAccountInput {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role_ids: Option<Vec<Uuid>>,
    pub enabled: Option<bool>,
    pub email_verified: Option<bool>,
}

pub struct ManageAccountUseCase<R>
where
    R: AccountRepository + RoleRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    lockout: LockoutPolicy<R>,
}

impl<R> ManageAccountUseCase<R>
where
    R: AccountRepository + RoleRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self {
            lockout: LockoutPolicy::new(repo.clone(), config.clone()),
            repo,
            config,
        }
    }

    pub async fn get_by_id(&self, account_id: Uuid) -> AuthResult<Account> {
        load_account(self.repo.as_ref(), account_id).await
    }

    pub async fn get_by_username(&self, username: &str) -> AuthResult<Account> {
        let username = UserName::new(username).map_err(|_| AuthError::AccountNotFound)?;
        self.repo
            .find_by_username(&username)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    /// All accounts, ordered by username
    pub async fn list(&self, request: PageRequest) -> AuthResult<Page<Account>> {
        self.repo.list(request).await
    }

    /// Accounts holding the role, ordered by username
    pub async fn list_by_role(
        &self,
        role_id: Uuid,
        request: PageRequest,
    ) -> AuthResult<Page<Account>> {
        let role_id = RoleId::from_uuid(role_id);
        if self.repo.find_role_by_id(&role_id).await?.is_none() {
            return Err(AuthError::RoleNotFound);
        }
        self.repo.find_by_role(&role_id, request).await
    }

    /// Accounts with a lock that has not yet expired
    pub async fn list_locked(&self) -> AuthResult<Vec<Account>> {
        self.repo.find_locked(Utc::now()).await
    }

    pub async fn update_account(
        &self,
        account_id: Uuid,
        input: UpdateAccountInput,
    ) -> AuthResult<Account> {
        let current = load_account(self.repo.as_ref(), account_id).await?;

        if input
            .username
            .as_deref()
            .is_some_and(|username| username != current.username.as_str())
        {
            return Err(AuthError::Validation(
                "Username cannot be changed".to_string(),
            ));
        }

        let mut edit = AccountEdit {
            enabled: input.enabled,
            email_verified: input.email_verified,
            ..AccountEdit::default()
        };

        if let Some(password) = input.password.filter(|p| !p.trim().is_empty()) {
            let raw = RawPassword::new(password)?;
            edit.password_hash = Some(UserPassword::from_raw(&raw, self.config.pepper())?);
        }

        if let Some(role_ids) = input.role_ids.filter(|ids| !ids.is_empty()) {
            edit.roles = Some(resolve_roles(self.repo.as_ref(), &role_ids).await?);
        }

        if edit.is_empty() {
            return Ok(current);
        }

        let account = self
            .repo
            .edit(&current.account_id, &edit, Utc::now())
            .await?;

        tracing::info!(
            username = %account.username,
            password_changed = edit.password_hash.is_some(),
            enabled = ?edit.enabled,
            email_verified = ?edit.email_verified,
            roles = ?account.role_names(),
            "Account updated"
        );
        Ok(account)
    }

    pub async fn verify_email(&self, account_id: Uuid) -> AuthResult<Account> {
        let account = self
            .repo
            .apply_change(
                &AccountId::from_uuid(account_id),
                AccountChange::VerifyEmail,
                Utc::now(),
            )
            .await?;

        tracing::info!(username = %account.username, "Email verified");
        Ok(account)
    }

    pub async fn set_enabled(&self, account_id: Uuid, enabled: bool) -> AuthResult<Account> {
        let account = self
            .repo
            .apply_change(
                &AccountId::from_uuid(account_id),
                AccountChange::SetEnabled(enabled),
                Utc::now(),
            )
            .await?;

        tracing::info!(username = %account.username, enabled, "Account enablement changed");
        Ok(account)
    }

    pub async fn lock(
        &self,
        account_id: Uuid,
        until: DateTime<Utc>,
        reason: Option<&str>,
    ) -> AuthResult<Account> {
        self.lockout
            .lock(&AccountId::from_uuid(account_id), until, reason, Utc::now())
            .await
    }

    pub async fn unlock(&self, account_id: Uuid) -> AuthResult<Account> {
        self.lockout
            .unlock(&AccountId::from_uuid(account_id), Utc::now())
            .await
    }

    /// Set a new password. Also clears the failure counter and any lock.
    pub async fn reset_password(&self, username: &str, new_password: String) -> AuthResult<Account> {
        let account = self.get_by_username(username).await?;
        let raw = RawPassword::new(new_password)?;
        let password_hash = UserPassword::from_raw(&raw, self.config.pepper())?;

        let account = self
            .repo
            .apply_change(
                &account.account_id,
                AccountChange::ResetPassword(password_hash),
                Utc::now(),
            )
            .await?;

        tracing::info!(username = %account.username, "Password reset");
        Ok(account)
    }
}
