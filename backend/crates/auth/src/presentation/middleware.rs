//! Auth Middleware
//!
//! The request gate and the extractor downstream handlers use to demand an
//! identity.

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::Request;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::token_service::TokenService;
use crate::application::{AuthContext, AuthenticateRequestUseCase};
use crate::domain::entity::principal::Principal;
use crate::domain::repository::AccountRepository;
use crate::error::AuthError;

/// Middleware state
#[derive(Clone)]
pub struct AuthMiddlewareState<R>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub tokens: Arc<TokenService>,
}

/// Establish the caller's identity for the rest of the pipeline.
///
/// Inserts an [`AuthContext`] into request extensions and always continues:
/// public paths and requests without a usable token simply carry no
/// [`Principal`]. Rejection is left to handlers via the extractor.
pub async fn authenticate_request<R>(
    State(state): State<AuthMiddlewareState<R>>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    if state.config.is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let bearer = platform::bearer::extract_bearer(req.headers()).map(str::to_owned);

    let use_case = AuthenticateRequestUseCase::new(state.repo.clone(), state.tokens.clone());
    let context = use_case.execute(bearer.as_deref(), Utc::now()).await;

    if let AuthContext::Rejected(rejection) = &context {
        tracing::debug!(
            path = %req.uri().path(),
            rejection = ?rejection,
            "Bearer token did not establish an identity"
        );
    }

    req.extensions_mut().insert(context);

    next.run(req).await
}

/// Requires an authenticated caller; rejects with a uniform 401 otherwise
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .and_then(AuthContext::principal)
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}
