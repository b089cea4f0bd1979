//! Authenticate Request Use Case
//!
//! Turns an optional bearer token into an [`AuthContext`]. Never fails:
//! every problem degrades to "no identity" so that a single access-control
//! layer downstream produces the uniform 401.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::token_service::TokenService;
use crate::domain::entity::principal::Principal;
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::user_name::UserName;
use crate::error::AuthError;

/// Why a presented token did not yield an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Expired,
    Malformed,
    /// Token is valid but the account is gone, disabled, unverified or locked
    AccountUnavailable,
    /// The account could not be re-checked
    LookupFailed,
}

/// Request-scoped identity, stored in request extensions by the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// No bearer token was presented
    Anonymous,
    Authenticated(Principal),
    Rejected(TokenRejection),
}

impl AuthContext {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthContext::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal().is_some()
    }
}

pub struct AuthenticateRequestUseCase<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
    tokens: Arc<TokenService>,
}

impl<R> AuthenticateRequestUseCase<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>, tokens: Arc<TokenService>) -> Self {
        Self { repo, tokens }
    }

    pub async fn execute(&self, bearer: Option<&str>, now: DateTime<Utc>) -> AuthContext {
        let Some(token) = bearer else {
            return AuthContext::Anonymous;
        };

        let claims = match self.tokens.parse_and_validate_at(token, now) {
            Ok(claims) => claims,
            Err(AuthError::TokenExpired) => return AuthContext::Rejected(TokenRejection::Expired),
            Err(_) => return AuthContext::Rejected(TokenRejection::Malformed),
        };

        // The token outlives any change to the account; re-check its state.
        let Ok(username) = UserName::new(claims.sub.as_str()) else {
            return AuthContext::Rejected(TokenRejection::AccountUnavailable);
        };

        let account = match self.repo.find_by_username(&username).await {
            Ok(account) => account,
            Err(e) => {
                tracing::error!(error = %e, username = %username, "Account re-check failed");
                return AuthContext::Rejected(TokenRejection::LookupFailed);
            }
        };

        match account {
            Some(account) if account.state(now).is_active() => {
                // Roles as signed, not as currently stored.
                AuthContext::Authenticated(Principal::new(claims.sub, claims.roles))
            }
            _ => AuthContext::Rejected(TokenRejection::AccountUnavailable),
        }
    }
}
