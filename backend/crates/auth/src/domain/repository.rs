//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the
//! infrastructure layer.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, RoleId};

use crate::domain::entity::{
    account::Account,
    account_change::{AccountChange, AccountEdit},
    role::Role,
};
use crate::domain::value_object::{
    page::{Page, PageRequest},
    user_name::UserName,
};
use crate::error::AuthResult;

/// Account directory and account persistence
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Insert a new account together with its role assignments
    async fn create(&self, account: &Account) -> AuthResult<()>;

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>>;

    /// Case-sensitive exact match
    async fn find_by_username(&self, username: &UserName) -> AuthResult<Option<Account>>;

    async fn exists_by_username(&self, username: &UserName) -> AuthResult<bool>;

    /// Apply one change to the stored account and return the result.
    ///
    /// Only the fields the change names are written, in a single atomic
    /// step against the current row. A `LockIfUnlocked` that finds an
    /// active lock returns the account unchanged.
    async fn apply_change(
        &self,
        account_id: &AccountId,
        change: AccountChange,
        now: DateTime<Utc>,
    ) -> AuthResult<Account>;

    /// Administrative edit, role replacement included, applied atomically
    async fn edit(
        &self,
        account_id: &AccountId,
        edit: &AccountEdit,
        now: DateTime<Utc>,
    ) -> AuthResult<Account>;

    /// Accounts whose `locked_until` is after `now`
    async fn find_locked(&self, now: DateTime<Utc>) -> AuthResult<Vec<Account>>;

    /// All accounts ordered by username
    async fn list(&self, request: PageRequest) -> AuthResult<Page<Account>>;

    /// Accounts holding the role, ordered by username
    async fn find_by_role(
        &self,
        role_id: &RoleId,
        request: PageRequest,
    ) -> AuthResult<Page<Account>>;
}

/// Role catalog
#[trait_variant::make(RoleRepository: Send)]
pub trait LocalRoleRepository {
    async fn find_role_by_id(&self, role_id: &RoleId) -> AuthResult<Option<Role>>;

    async fn find_role_by_name(&self, name: &str) -> AuthResult<Option<Role>>;

    /// Insert a role and its permission names
    async fn create_role(&self, role: &Role) -> AuthResult<()>;
}
