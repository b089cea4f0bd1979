//! Application Layer
//!
//! Use cases and application services.

pub mod authenticate_request;
pub mod bootstrap;
pub mod config;
pub mod create_account;
pub mod lockout;
pub mod login;
pub mod manage_account;
pub mod token_service;
pub mod verify_credentials;

// Re-exports
pub use authenticate_request::{AuthContext, AuthenticateRequestUseCase, TokenRejection};
pub use bootstrap::BootstrapAdminUseCase;
pub use config::{AuthConfig, LockoutConfig};
pub use create_account::{CreateAccountInput, CreateAccountUseCase};
pub use lockout::LockoutPolicy;
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use manage_account::{ManageAccountUseCase, UpdateAccountInput};
pub use token_service::{TokenClaims, TokenService};
pub use verify_credentials::{AuthFailureReason, VerifyCredentialsUseCase, VerifyOutcome};
