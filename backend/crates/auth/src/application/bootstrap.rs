//! Bootstrap Admin Use Case
//!
//! Seeds the `ADMIN` role and a first administrator so that a fresh
//! deployment can be managed at all. Idempotent.

use std::sync::Arc;

use chrono::Utc;

use crate::application::config::AuthConfig;
use crate::domain::entity::{
    account::Account,
    role::{ADMIN_ROLE, Role},
};
use crate::domain::repository::{AccountRepository, RoleRepository};
use crate::domain::value_object::{
    user_name::UserName,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

/// Permission carried by the seeded admin role
pub const ACCOUNT_ADMIN_PERMISSION: &str = "account:admin";

pub struct BootstrapAdminUseCase<R>
where
    R: AccountRepository + RoleRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> BootstrapAdminUseCase<R>
where
    R: AccountRepository + RoleRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    /// Returns `true` if the admin account was created by this call.
    pub async fn execute(&self, username: &str, password: String) -> AuthResult<bool> {
        let username =
            UserName::new(username).map_err(|e| AuthError::Validation(e.to_string()))?;

        let role = match self.repo.find_role_by_name(ADMIN_ROLE).await? {
            Some(role) => role,
            None => {
                let role = Role::new(
                    ADMIN_ROLE,
                    Some("Account administration".to_string()),
                    [ACCOUNT_ADMIN_PERMISSION.to_string()],
                );
                self.repo.create_role(&role).await?;
                tracing::info!(role_id = %role.role_id, "Seeded admin role");
                role
            }
        };

        if self.repo.exists_by_username(&username).await? {
            tracing::debug!(username = %username, "Admin account already present");
            return Ok(false);
        }

        let raw = RawPassword::new(password)?;
        let password_hash = UserPassword::from_raw(&raw, self.config.pepper())?;

        let now = Utc::now();
        let mut account = Account::new(username, password_hash, vec![role], now);
        account.verify_email(now);
        self.repo.create(&account).await?;

        tracing::info!(username = %account.username, "Seeded admin account");
        Ok(true)
    }
}
