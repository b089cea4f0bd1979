//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::account::Account;
use crate::domain::entity::principal::Principal;
use crate::domain::value_object::page::{DEFAULT_PAGE_SIZE, Page, PageRequest};

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response: the account view plus the bearer token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: Uuid,
    pub username: String,
    pub email_verified: bool,
    pub enabled: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub role_names: Vec<String>,
    pub token: String,
}

impl LoginResponse {
    pub fn new(account: &Account, token: String) -> Self {
        Self {
            id: *account.account_id.as_uuid(),
            username: account.username.to_string(),
            email_verified: account.email_verified,
            enabled: account.enabled,
            last_login: account.last_login,
            role_names: account.role_names().into_iter().collect(),
            token,
        }
    }
}

// ============================================================================
// Current Identity
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub username: String,
    pub role_names: Vec<String>,
}

impl From<Principal> for MeResponse {
    fn from(principal: Principal) -> Self {
        Self {
            username: principal.username,
            role_names: principal.roles.into_iter().collect(),
        }
    }
}

// ============================================================================
// Account Administration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub username: String,
    pub password: String,
    pub role_ids: Vec<Uuid>,
}

/// `PUT /api/accounts/{id}` body; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateAccountRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role_ids: Option<Vec<Uuid>>,
    pub enabled: Option<bool>,
    pub email_verified: Option<bool>,
}

/// `?page=&size=` query; zero-based page, size clamped on conversion
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        PageRequest::new(
            query.page.unwrap_or(0),
            query.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockAccountRequest {
    pub lock_until: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub username: String,
    pub new_password: String,
}

/// Administrative account view. Never includes the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub email_verified: bool,
    pub enabled: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub role_ids: Vec<Uuid>,
    pub role_names: Vec<String>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: *account.account_id.as_uuid(),
            username: account.username.to_string(),
            email_verified: account.email_verified,
            enabled: account.enabled,
            last_login: account.last_login,
            failed_attempts: account.failed_attempts,
            locked_until: account.locked_until,
            created_at: account.created_at,
            updated_at: account.updated_at,
            role_ids: account.role_ids().into_iter().map(Uuid::from).collect(),
            role_names: account.role_names().into_iter().collect(),
        }
    }
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self::from(&account)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl From<Page<Account>> for PageResponse<AccountResponse> {
    fn from(page: Page<Account>) -> Self {
        let total_pages = page.total_pages();
        Self {
            page: page.request.page,
            size: page.request.size,
            total_elements: page.total,
            total_pages,
            content: page.items.iter().map(AccountResponse::from).collect(),
        }
    }
}
