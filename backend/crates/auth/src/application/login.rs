//! Login Use Case
//!
//! Verifies credentials, records the outcome, and issues a bearer token.
//! Every failure leaves the caller with the same `InvalidCredentials`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::config::AuthConfig;
use crate::application::lockout::LockoutPolicy;
use crate::application::token_service::TokenService;
use crate::application::verify_credentials::{VerifyCredentialsUseCase, VerifyOutcome};
use crate::domain::entity::account::Account;
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::user_password::RawPassword;
use crate::error::{AuthError, AuthResult};

pub struct LoginInput {
    pub username: String,
    pub password: String,
}

pub struct LoginOutput {
    /// Account state after the successful login was recorded
    pub account: Account,
    pub token: String,
}

pub struct LoginUseCase<R>
where
    R: AccountRepository,
{
    verifier: VerifyCredentialsUseCase<R>,
    lockout: LockoutPolicy<R>,
    tokens: Arc<TokenService>,
}

impl<R> LoginUseCase<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, tokens: Arc<TokenService>) -> Self {
        Self {
            verifier: VerifyCredentialsUseCase::new(repo.clone(), config.clone()),
            lockout: LockoutPolicy::new(repo, config),
            tokens,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> AuthResult<LoginOutput> {
        self.execute_at(input, Utc::now()).await
    }

    pub async fn execute_at(&self, input: LoginInput, now: DateTime<Utc>) -> AuthResult<LoginOutput> {
        let password = RawPassword::attempt(input.password);
        let outcome = self.verifier.execute(&input.username, password, now).await?;

        let mut account = match outcome {
            VerifyOutcome::Verified(account) => account,
            VerifyOutcome::Rejected { reason, account } => {
                // Counted even for disabled, unverified or locked accounts.
                if let Some(mut account) = account {
                    self.lockout.record_failure(&mut account, now).await?;
                    tracing::warn!(
                        username = %account.username,
                        reason = ?reason,
                        failed_attempts = account.failed_attempts,
                        "Login failed"
                    );
                } else {
                    tracing::warn!(reason = ?reason, "Login failed");
                }
                return Err(AuthError::InvalidCredentials);
            }
        };

        self.lockout.record_success(&mut account, now).await?;

        let token = self
            .tokens
            .issue_at(account.username.as_str(), account.role_names(), now)?;

        tracing::info!(
            username = %account.username,
            account_id = %account.account_id,
            "User logged in"
        );

        Ok(LoginOutput { account, token })
    }
}
