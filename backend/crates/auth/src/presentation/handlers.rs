//! HTTP Handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::application::token_service::TokenService;
use crate::application::{
    CreateAccountInput, CreateAccountUseCase, LoginInput, LoginUseCase, ManageAccountUseCase,
    UpdateAccountInput,
};
use crate::domain::entity::{principal::Principal, role::ADMIN_ROLE};
use crate::domain::repository::{AccountRepository, RoleRepository};
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    AccountResponse, CreateAccountRequest, LockAccountRequest, LoginRequest, LoginResponse,
    MeResponse, PageQuery, PageResponse, PasswordResetRequest, UpdateAccountRequest,
};

/// Shared state for auth handlers
#[derive(Clone)]
pub struct AuthAppState<R>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub tokens: Arc<TokenService>,
}

// ============================================================================
// Login
// ============================================================================

/// POST /api/auth/login
pub async fn login<R>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<LoginRequest>,
) -> AuthResult<Json<LoginResponse>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    if req.username.trim().is_empty() || req.password.trim().is_empty() {
        return Err(AuthError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let use_case = LoginUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.tokens.clone(),
    );

    let output = use_case
        .execute(LoginInput {
            username: req.username,
            password: req.password,
        })
        .await?;

    Ok(Json(LoginResponse::new(&output.account, output.token)))
}

/// GET /api/auth/me
pub async fn me(principal: Principal) -> Json<MeResponse> {
    Json(principal.into())
}

// ============================================================================
// Account Administration (ADMIN)
// ============================================================================

/// POST /api/accounts
pub async fn create_account<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Json(req): Json<CreateAccountRequest>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let use_case = CreateAccountUseCase::new(state.repo.clone(), state.config.clone());
    let account = use_case
        .execute(CreateAccountInput {
            username: req.username,
            password: req.password,
            role_ids: req.role_ids,
        })
        .await?;

    Ok(Json(account.into()))
}

/// GET /api/accounts?page=&size=
pub async fn list_accounts<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Query(query): Query<PageQuery>,
) -> AuthResult<Json<PageResponse<AccountResponse>>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let page = manage(&state).list(query.into()).await?;
    Ok(Json(page.into()))
}

/// GET /api/accounts/by-role/{role_id}?page=&size=
pub async fn list_accounts_by_role<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Path(role_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> AuthResult<Json<PageResponse<AccountResponse>>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let page = manage(&state).list_by_role(role_id, query.into()).await?;
    Ok(Json(page.into()))
}

/// GET /api/accounts/{id}
pub async fn get_account<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Path(account_id): Path<Uuid>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let account = manage(&state).get_by_id(account_id).await?;
    Ok(Json(account.into()))
}

/// PUT /api/accounts/{id}
pub async fn update_account<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Path(account_id): Path<Uuid>,
    Json(req): Json<UpdateAccountRequest>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let account = manage(&state)
        .update_account(
            account_id,
            UpdateAccountInput {
                username: req.username,
                password: req.password,
                role_ids: req.role_ids,
                enabled: req.enabled,
                email_verified: req.email_verified,
            },
        )
        .await?;
    Ok(Json(account.into()))
}

/// GET /api/accounts/locked
pub async fn list_locked_accounts<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
) -> AuthResult<Json<Vec<AccountResponse>>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let accounts = manage(&state).list_locked().await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

/// GET /api/accounts/by-username/{username}
pub async fn get_account_by_username<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Path(username): Path<String>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let account = manage(&state).get_by_username(&username).await?;
    Ok(Json(account.into()))
}

/// POST /api/accounts/{id}/verify-email
pub async fn verify_email<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Path(account_id): Path<Uuid>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let account = manage(&state).verify_email(account_id).await?;
    Ok(Json(account.into()))
}

/// POST /api/accounts/{id}/enable
pub async fn enable_account<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Path(account_id): Path<Uuid>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let account = manage(&state).set_enabled(account_id, true).await?;
    Ok(Json(account.into()))
}

/// POST /api/accounts/{id}/disable
pub async fn disable_account<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Path(account_id): Path<Uuid>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let account = manage(&state).set_enabled(account_id, false).await?;
    Ok(Json(account.into()))
}

/// POST /api/accounts/{id}/lock
pub async fn lock_account<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Path(account_id): Path<Uuid>,
    Json(req): Json<LockAccountRequest>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let account = manage(&state)
        .lock(account_id, req.lock_until, req.reason.as_deref())
        .await?;
    Ok(Json(account.into()))
}

/// POST /api/accounts/{id}/unlock
pub async fn unlock_account<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Path(account_id): Path<Uuid>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let account = manage(&state).unlock(account_id).await?;
    Ok(Json(account.into()))
}

/// POST /api/accounts/password-reset
pub async fn reset_password<R>(
    State(state): State<AuthAppState<R>>,
    principal: Principal,
    Json(req): Json<PasswordResetRequest>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    principal.require_role(ADMIN_ROLE)?;

    let account = manage(&state)
        .reset_password(&req.username, req.new_password)
        .await?;
    Ok(Json(account.into()))
}

fn manage<R>(state: &AuthAppState<R>) -> ManageAccountUseCase<R>
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    ManageAccountUseCase::new(state.repo.clone(), state.config.clone())
}
