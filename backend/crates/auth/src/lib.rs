//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases and application services
//! - `infra/` - PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers, DTOs, router, request gate
//!
//! ## Features
//! - Username + password login returning an HS256 bearer token
//! - Per-request gate that turns `Authorization: Bearer` into a [`Principal`]
//! - Failed-attempt tracking, administrative time-boxed locks, optional
//!   automatic lockout
//! - Account administration (create, verify email, enable/disable,
//!   lock/unlock, password reset) restricted to the `ADMIN` role
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optional pepper
//! - Every login failure is reported as the same `InvalidCredentials`
//! - Tokens are stateless: roles are those granted at issuance, valid
//!   until expiry. The gate re-checks that the account is still enabled,
//!   verified and unlocked.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::authenticate_request::AuthContext;
pub use application::config::{AuthConfig, LockoutConfig};
pub use application::token_service::TokenService;
pub use domain::entity::principal::Principal;
pub use error::{AuthError, AuthResult};
pub use infra::{memory::InMemoryAuthRepository, postgres::PgAuthRepository};
pub use presentation::router::{auth_router, auth_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod store {
    pub use crate::infra::memory::InMemoryAuthRepository as MemoryAuthStore;
    pub use crate::infra::postgres::PgAuthRepository as AuthStore;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
