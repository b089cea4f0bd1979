//! Create Account Use Case

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{AccountId, RoleId};
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::domain::entity::{account::Account, role::Role};
use crate::domain::repository::{AccountRepository, RoleRepository};
use crate::domain::value_object::{
    user_name::UserName,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

pub struct CreateAccountInput {
    pub username: String,
    pub password: String,
    pub role_ids: Vec<Uuid>,
}

pub struct CreateAccountUseCase<R>
where
    R: AccountRepository + RoleRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> CreateAccountUseCase<R>
where
    R: AccountRepository + RoleRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, input: CreateAccountInput) -> AuthResult<Account> {
        let username =
            UserName::new(input.username).map_err(|e| AuthError::Validation(e.to_string()))?;
        let raw_password = RawPassword::new(input.password)?;

        if input.role_ids.is_empty() {
            return Err(AuthError::Validation(
                "At least one role is required".to_string(),
            ));
        }

        let roles = resolve_roles(self.repo.as_ref(), &input.role_ids).await?;

        if self.repo.exists_by_username(&username).await? {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = UserPassword::from_raw(&raw_password, self.config.pepper())?;
        let account = Account::new(username, password_hash, roles, Utc::now());

        self.repo.create(&account).await?;

        tracing::info!(
            account_id = %account.account_id,
            username = %account.username,
            roles = ?account.role_names(),
            "Account created"
        );

        Ok(account)
    }
}

/// Resolve role ids in order, dropping duplicates. Any unknown id fails
/// the whole lookup with `RoleNotFound`.
pub(crate) async fn resolve_roles<R>(repo: &R, role_ids: &[Uuid]) -> AuthResult<Vec<Role>>
where
    R: RoleRepository,
{
    let mut roles = Vec::with_capacity(role_ids.len());
    for role_id in role_ids {
        let role = repo
            .find_role_by_id(&RoleId::from_uuid(*role_id))
            .await?
            .ok_or(AuthError::RoleNotFound)?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

/// Look up an account or fail with `AccountNotFound`
pub(crate) async fn load_account<R>(repo: &R, account_id: Uuid) -> AuthResult<Account>
where
    R: AccountRepository,
{
    repo.find_by_id(&AccountId::from_uuid(account_id))
        .await?
        .ok_or(AuthError::AccountNotFound)
}
