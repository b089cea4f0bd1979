//! In-Memory Repository Implementation
//!
//! Backs the test suite and database-less development runs. Same
//! semantics as the PostgreSQL implementation: unique usernames, and
//! changes applied to the stored account under the write lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, RoleId};
use tokio::sync::RwLock;

use crate::domain::entity::{
    account::Account,
    account_change::{AccountChange, AccountEdit},
    role::Role,
};
use crate::domain::repository::{AccountRepository, RoleRepository};
use crate::domain::value_object::{
    page::{Page, PageRequest},
    user_name::UserName,
};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    roles: HashMap<RoleId, Role>,
}

#[derive(Clone, Default)]
pub struct InMemoryAuthRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for InMemoryAuthRepository {
    async fn create(&self, account: &Account) -> AuthResult<()> {
        let mut state = self.state.write().await;

        if state
            .accounts
            .values()
            .any(|a| a.username == account.username)
        {
            return Err(AuthError::UsernameTaken);
        }
        if let Some(role) = account
            .roles
            .iter()
            .find(|r| !state.roles.contains_key(&r.role_id))
        {
            tracing::debug!(role_id = %role.role_id, "Unknown role on account insert");
            return Err(AuthError::RoleNotFound);
        }

        state.accounts.insert(account.account_id, account.clone());
        Ok(())
    }

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>> {
        Ok(self.state.read().await.accounts.get(account_id).cloned())
    }

    async fn find_by_username(&self, username: &UserName) -> AuthResult<Option<Account>> {
        Ok(self
            .state
            .read()
            .await
            .accounts
            .values()
            .find(|a| &a.username == username)
            .cloned())
    }

    async fn exists_by_username(&self, username: &UserName) -> AuthResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .accounts
            .values()
            .any(|a| &a.username == username))
    }

    async fn apply_change(
        &self,
        account_id: &AccountId,
        change: AccountChange,
        now: DateTime<Utc>,
    ) -> AuthResult<Account> {
        let mut state = self.state.write().await;
        let stored = state
            .accounts
            .get_mut(account_id)
            .ok_or(AuthError::AccountNotFound)?;

        stored.apply(&change, now)?;
        Ok(stored.clone())
    }

    async fn edit(
        &self,
        account_id: &AccountId,
        edit: &AccountEdit,
        now: DateTime<Utc>,
    ) -> AuthResult<Account> {
        let mut state = self.state.write().await;
        let MemoryState { accounts, roles } = &mut *state;

        let stored = accounts
            .get_mut(account_id)
            .ok_or(AuthError::AccountNotFound)?;
        let unknown_role = edit
            .roles
            .as_ref()
            .is_some_and(|new_roles| new_roles.iter().any(|r| !roles.contains_key(&r.role_id)));
        if unknown_role {
            return Err(AuthError::RoleNotFound);
        }

        stored.apply_edit(edit, now)?;
        Ok(stored.clone())
    }

    async fn find_locked(&self, now: DateTime<Utc>) -> AuthResult<Vec<Account>> {
        let state = self.state.read().await;
        let mut locked: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.is_locked(now))
            .cloned()
            .collect();
        locked.sort_by_key(|a| a.locked_until);
        Ok(locked)
    }

    async fn list(&self, request: PageRequest) -> AuthResult<Page<Account>> {
        let state = self.state.read().await;
        Ok(Page::slice(by_username(state.accounts.values()), request))
    }

    async fn find_by_role(
        &self,
        role_id: &RoleId,
        request: PageRequest,
    ) -> AuthResult<Page<Account>> {
        let state = self.state.read().await;
        let holders = state
            .accounts
            .values()
            .filter(|a| a.roles.iter().any(|r| &r.role_id == role_id));
        Ok(Page::slice(by_username(holders), request))
    }
}

fn by_username<'a>(accounts: impl Iterator<Item = &'a Account>) -> Vec<Account> {
    let mut sorted: Vec<Account> = accounts.cloned().collect();
    sorted.sort_by(|a, b| a.username.as_str().cmp(b.username.as_str()));
    sorted
}

// ============================================================================
// Role Repository Implementation
// ============================================================================

impl RoleRepository for InMemoryAuthRepository {
    async fn find_role_by_id(&self, role_id: &RoleId) -> AuthResult<Option<Role>> {
        Ok(self.state.read().await.roles.get(role_id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AuthResult<Option<Role>> {
        Ok(self
            .state
            .read()
            .await
            .roles
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn create_role(&self, role: &Role) -> AuthResult<()> {
        let mut state = self.state.write().await;
        if state.roles.values().any(|r| r.name == role.name) {
            return Err(AuthError::Validation(format!(
                "Role '{}' already exists",
                role.name
            )));
        }
        state.roles.insert(role.role_id, role.clone());
        Ok(())
    }
}
