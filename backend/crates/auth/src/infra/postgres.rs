//! PostgreSQL Repository Implementations

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, RoleId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{
    account::Account,
    account_change::{AccountChange, AccountEdit},
    role::Role,
};
use crate::domain::repository::{AccountRepository, RoleRepository};
use crate::domain::value_object::{
    page::{Page, PageRequest},
    user_name::UserName,
    user_password::UserPassword,
};
use crate::error::{AuthError, AuthResult};

const ACCOUNT_COLUMNS: &str = r#"
    account_id,
    username,
    password_hash,
    email_verified,
    enabled,
    last_login,
    failed_attempts,
    locked_until,
    created_at,
    updated_at
"#;

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch accounts by a `WHERE` clause and attach their roles
    async fn fetch_accounts<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, sqlx::Postgres, AccountRow, sqlx::postgres::PgArguments>,
    ) -> AuthResult<Vec<Account>> {
        let rows = query.fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.account_id).collect();
        let mut roles = self.roles_for_accounts(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let account_roles = roles.remove(&row.account_id).unwrap_or_default();
                row.into_account(account_roles)
            })
            .collect()
    }

    async fn roles_for_accounts(&self, account_ids: &[Uuid]) -> AuthResult<HashMap<Uuid, Vec<Role>>> {
        let rows = sqlx::query_as::<_, AccountRoleRow>(
            r#"
            SELECT
                ar.account_id,
                r.role_id,
                r.name,
                r.description,
                COALESCE(
                    array_agg(rp.permission) FILTER (WHERE rp.permission IS NOT NULL),
                    '{}'::TEXT[]
                ) AS permissions
            FROM account_roles ar
            JOIN roles r ON r.role_id = ar.role_id
            LEFT JOIN role_permissions rp ON rp.role_id = r.role_id
            WHERE ar.account_id = ANY($1)
            GROUP BY ar.account_id, r.role_id, r.name, r.description
            ORDER BY r.name
            "#,
        )
        .bind(account_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_account: HashMap<Uuid, Vec<Role>> = HashMap::new();
        for row in rows {
            let account_id = row.account_id;
            by_account
                .entry(account_id)
                .or_default()
                .push(row.role.into_role());
        }
        Ok(by_account)
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for PgAuthRepository {
    async fn create(&self, account: &Account) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO accounts (
                account_id,
                username,
                password_hash,
                email_verified,
                enabled,
                last_login,
                failed_attempts,
                locked_until,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(account.account_id.as_uuid())
        .bind(account.username.as_str())
        .bind(account.password_hash.as_phc_string())
        .bind(account.email_verified)
        .bind(account.enabled)
        .bind(account.last_login)
        .bind(failed_attempts_to_db(account.failed_attempts))
        .bind(account.locked_until)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AuthError::UsernameTaken);
            }
            Err(e) => return Err(e.into()),
        }

        for role_id in account.role_ids() {
            insert_account_role(&mut tx, &account.account_id, &role_id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1");
        let query = sqlx::query_as::<_, AccountRow>(&sql).bind(*account_id.as_uuid());
        Ok(self.fetch_accounts(query).await?.pop())
    }

    async fn find_by_username(&self, username: &UserName) -> AuthResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1");
        let query = sqlx::query_as::<_, AccountRow>(&sql).bind(username.as_str());
        Ok(self.fetch_accounts(query).await?.pop())
    }

    async fn exists_by_username(&self, username: &UserName) -> AuthResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1)",
        )
        .bind(username.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn apply_change(
        &self,
        account_id: &AccountId,
        change: AccountChange,
        now: DateTime<Utc>,
    ) -> AuthResult<Account> {
        change.validate(now)?;

        // $1 = account id, $2 = now, $3 = the change's own value
        let sql = format!(
            "UPDATE accounts SET {} RETURNING {ACCOUNT_COLUMNS}",
            change_assignments(&change)
        );
        let query = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(*account_id.as_uuid())
            .bind(now);
        let query = match &change {
            AccountChange::Lock(until) | AccountChange::LockIfUnlocked(until) => query.bind(*until),
            AccountChange::SetEnabled(enabled) => query.bind(*enabled),
            AccountChange::ResetPassword(hash) => query.bind(hash.as_phc_string()),
            AccountChange::FailedAttempt
            | AccountChange::LoginSucceeded
            | AccountChange::Unlock
            | AccountChange::VerifyEmail => query,
        };

        if let Some(account) = self.fetch_accounts(query).await?.pop() {
            return Ok(account);
        }

        // No row matched: either the account is gone or a guarded change
        // (active lock, saturated counter) had nothing to do.
        self.find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    async fn edit(
        &self,
        account_id: &AccountId,
        edit: &AccountEdit,
        now: DateTime<Utc>,
    ) -> AuthResult<Account> {
        edit.validate()?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                password_hash = COALESCE($2, password_hash),
                enabled = COALESCE($3, enabled),
                email_verified = COALESCE($4, email_verified),
                updated_at = $5
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(edit.password_hash.as_ref().map(UserPassword::as_phc_string))
        .bind(edit.enabled)
        .bind(edit.email_verified)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::AccountNotFound);
        }

        if let Some(roles) = &edit.roles {
            sqlx::query("DELETE FROM account_roles WHERE account_id = $1")
                .bind(account_id.as_uuid())
                .execute(&mut *tx)
                .await?;
            for role in roles {
                insert_account_role(&mut tx, account_id, &role.role_id).await?;
            }
        }

        tx.commit().await?;

        self.find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    async fn find_locked(&self, now: DateTime<Utc>) -> AuthResult<Vec<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE locked_until > $1 ORDER BY locked_until"
        );
        let query = sqlx::query_as::<_, AccountRow>(&sql).bind(now);
        self.fetch_accounts(query).await
    }

    async fn list(&self, request: PageRequest) -> AuthResult<Page<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY username LIMIT $1 OFFSET $2"
        );
        let query = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(page_bound(request.limit()))
            .bind(page_bound(request.offset()));
        let items = self.fetch_accounts(query).await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;

        Ok(Page {
            items,
            request,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn find_by_role(
        &self,
        role_id: &RoleId,
        request: PageRequest,
    ) -> AuthResult<Page<Account>> {
        let sql = format!(
            r#"
            SELECT {ACCOUNT_COLUMNS} FROM accounts
            WHERE account_id IN (SELECT account_id FROM account_roles WHERE role_id = $1)
            ORDER BY username
            LIMIT $2 OFFSET $3
            "#
        );
        let query = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(*role_id.as_uuid())
            .bind(page_bound(request.limit()))
            .bind(page_bound(request.offset()));
        let items = self.fetch_accounts(query).await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM account_roles WHERE role_id = $1",
        )
        .bind(role_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(Page {
            items,
            request,
            total: u64::try_from(total).unwrap_or(0),
        })
    }
}

// ============================================================================
// Role Repository Implementation
// ============================================================================

const ROLE_SELECT: &str = r#"
    SELECT
        r.role_id,
        r.name,
        r.description,
        COALESCE(
            array_agg(rp.permission) FILTER (WHERE rp.permission IS NOT NULL),
            '{}'::TEXT[]
        ) AS permissions
    FROM roles r
    LEFT JOIN role_permissions rp ON rp.role_id = r.role_id
"#;

impl RoleRepository for PgAuthRepository {
    async fn find_role_by_id(&self, role_id: &RoleId) -> AuthResult<Option<Role>> {
        let sql = format!("{ROLE_SELECT} WHERE r.role_id = $1 GROUP BY r.role_id");
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(role_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(RoleRow::into_role))
    }

    async fn find_role_by_name(&self, name: &str) -> AuthResult<Option<Role>> {
        let sql = format!("{ROLE_SELECT} WHERE r.name = $1 GROUP BY r.role_id");
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(RoleRow::into_role))
    }

    async fn create_role(&self, role: &Role) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO roles (role_id, name, description) VALUES ($1, $2, $3)")
            .bind(role.role_id.as_uuid())
            .bind(&role.name)
            .bind(role.description.as_deref())
            .execute(&mut *tx)
            .await?;

        for permission in &role.permissions {
            sqlx::query("INSERT INTO role_permissions (role_id, permission) VALUES ($1, $2)")
                .bind(role.role_id.as_uuid())
                .bind(permission)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

// ============================================================================
// Database Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    account_id: Uuid,
    username: String,
    password_hash: String,
    email_verified: bool,
    enabled: bool,
    last_login: Option<DateTime<Utc>>,
    failed_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self, roles: Vec<Role>) -> AuthResult<Account> {
        let username = UserName::new(self.username)
            .map_err(|e| AuthError::Internal(format!("Invalid username in database: {}", e)))?;
        let failed_attempts = u32::try_from(self.failed_attempts).map_err(|_| {
            AuthError::Internal("Negative failed_attempts in database".to_string())
        })?;

        Ok(Account {
            account_id: AccountId::from_uuid(self.account_id),
            username,
            password_hash: UserPassword::from_phc_string(self.password_hash)?,
            email_verified: self.email_verified,
            enabled: self.enabled,
            last_login: self.last_login,
            failed_attempts,
            locked_until: self.locked_until,
            created_at: self.created_at,
            updated_at: self.updated_at,
            roles,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    role_id: Uuid,
    name: String,
    description: Option<String>,
    permissions: Vec<String>,
}

impl RoleRow {
    fn into_role(self) -> Role {
        Role {
            role_id: RoleId::from_uuid(self.role_id),
            name: self.name,
            description: self.description,
            permissions: self.permissions.into_iter().collect(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct AccountRoleRow {
    account_id: Uuid,
    #[sqlx(flatten)]
    role: RoleRow,
}

/// The column is `INTEGER`; the counter saturates rather than overflow it.
fn failed_attempts_to_db(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn page_bound(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// `SET ... WHERE ...` body for a change; see `apply_change` for the
/// parameter layout.
fn change_assignments(change: &AccountChange) -> &'static str {
    match change {
        AccountChange::FailedAttempt => {
            "failed_attempts = failed_attempts + 1, updated_at = $2 \
             WHERE account_id = $1 AND failed_attempts < 2147483647"
        }
        AccountChange::LoginSucceeded => {
            "failed_attempts = 0, last_login = $2, updated_at = $2 WHERE account_id = $1"
        }
        AccountChange::LockIfUnlocked(_) => {
            "locked_until = $3, updated_at = $2 \
             WHERE account_id = $1 AND (locked_until IS NULL OR locked_until <= $2)"
        }
        AccountChange::Lock(_) => "locked_until = $3, updated_at = $2 WHERE account_id = $1",
        AccountChange::Unlock => {
            "locked_until = NULL, failed_attempts = 0, updated_at = $2 WHERE account_id = $1"
        }
        AccountChange::VerifyEmail => {
            "email_verified = TRUE, updated_at = $2 WHERE account_id = $1"
        }
        AccountChange::SetEnabled(_) => "enabled = $3, updated_at = $2 WHERE account_id = $1",
        AccountChange::ResetPassword(_) => {
            "password_hash = $3, failed_attempts = 0, locked_until = NULL, updated_at = $2 \
             WHERE account_id = $1"
        }
    }
}

async fn insert_account_role(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: &AccountId,
    role_id: &RoleId,
) -> AuthResult<()> {
    sqlx::query("INSERT INTO account_roles (account_id, role_id) VALUES ($1, $2)")
        .bind(account_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AuthError::RoleNotFound
            }
            other => other.into(),
        })?;
    Ok(())
}
