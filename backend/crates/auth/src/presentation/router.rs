//! Auth Router
//!
//! Routes are mounted with their full paths because the request gate
//! matches public prefixes against the complete request path.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::token_service::TokenService;
use crate::domain::repository::{AccountRepository, RoleRepository};
use crate::infra::postgres::PgAuthRepository;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{AuthMiddlewareState, authenticate_request};

/// Create the Auth router with PostgreSQL repository
pub fn auth_router(repo: PgAuthRepository, config: AuthConfig) -> Router {
    auth_router_generic(repo, config)
}

/// Create a generic Auth router for any repository implementation
pub fn auth_router_generic<R>(repo: R, config: AuthConfig) -> Router
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    let tokens = Arc::new(TokenService::new(&config));
    let state = AuthAppState {
        repo: Arc::new(repo),
        config: Arc::new(config),
        tokens,
    };

    let routes = Router::new()
        .route("/api/auth/login", post(handlers::login::<R>))
        .route("/api/auth/me", get(handlers::me))
        .route(
            "/api/accounts",
            post(handlers::create_account::<R>).get(handlers::list_accounts::<R>),
        )
        .route(
            "/api/accounts/{id}",
            get(handlers::get_account::<R>).put(handlers::update_account::<R>),
        )
        .route(
            "/api/accounts/by-role/{role_id}",
            get(handlers::list_accounts_by_role::<R>),
        )
        .route("/api/accounts/locked", get(handlers::list_locked_accounts::<R>))
        .route(
            "/api/accounts/by-username/{username}",
            get(handlers::get_account_by_username::<R>),
        )
        .route(
            "/api/accounts/password-reset",
            post(handlers::reset_password::<R>),
        )
        .route(
            "/api/accounts/{id}/verify-email",
            post(handlers::verify_email::<R>),
        )
        .route("/api/accounts/{id}/enable", post(handlers::enable_account::<R>))
        .route("/api/accounts/{id}/disable", post(handlers::disable_account::<R>))
        .route("/api/accounts/{id}/lock", post(handlers::lock_account::<R>))
        .route("/api/accounts/{id}/unlock", post(handlers::unlock_account::<R>))
        .with_state(state.clone());

    with_auth_gate(routes, &state)
}

/// Wrap any router in the request gate so its handlers can extract a
/// [`Principal`](crate::domain::entity::principal::Principal).
pub fn with_auth_gate<R>(router: Router, state: &AuthAppState<R>) -> Router
where
    R: AccountRepository + RoleRepository + Clone + Send + Sync + 'static,
{
    let gate_state = AuthMiddlewareState {
        repo: state.repo.clone(),
        config: state.config.clone(),
        tokens: state.tokens.clone(),
    };

    router.layer(middleware::from_fn_with_state(
        gate_state,
        authenticate_request::<R>,
    ))
}
