//! Tests for the auth crate
//!
//! Use-case and HTTP-level tests against the in-memory repository; no
//! database required.

#[cfg(test)]
mod support {
    use std::collections::BTreeSet;

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use chrono::Utc;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::application::config::AuthConfig;
    use crate::application::token_service::TokenService;
    use crate::domain::entity::{account::Account, account_change::AccountChange, role::Role};
    use crate::domain::repository::{AccountRepository, RoleRepository};
    use crate::domain::value_object::{
        user_name::UserName,
        user_password::{RawPassword, UserPassword},
    };
    use crate::infra::memory::InMemoryAuthRepository;
    use crate::presentation::router::auth_router_generic;

    pub const PASSWORD: &str = "Secret123!";

    pub fn config() -> AuthConfig {
        AuthConfig::with_secret(b"test-signing-key-test-signing-key".to_vec())
    }

    pub fn tokens(config: &AuthConfig) -> TokenService {
        TokenService::new(config)
    }

    pub fn role_set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    pub async fn seed_role(repo: &InMemoryAuthRepository, name: &str) -> Role {
        let role = Role::new(name, None, Vec::new());
        repo.create_role(&role).await.unwrap();
        role
    }

    /// Seed an account; `active` also verifies its email.
    pub async fn seed_account(
        repo: &InMemoryAuthRepository,
        username: &str,
        roles: Vec<Role>,
        active: bool,
    ) -> Account {
        let raw = RawPassword::new(PASSWORD.to_string()).unwrap();
        let now = Utc::now();
        let mut account = Account::new(
            UserName::new(username).unwrap(),
            UserPassword::from_raw(&raw, None).unwrap(),
            roles,
            now,
        );
        if active {
            account.verify_email(now);
        }
        repo.create(&account).await.unwrap();
        account
    }

    /// Apply a stored change outside any login, as an administrator would
    pub async fn change(
        repo: &InMemoryAuthRepository,
        account: &Account,
        change: AccountChange,
    ) -> Account {
        repo.apply_change(&account.account_id, change, Utc::now())
            .await
            .unwrap()
    }

    pub async fn reload(repo: &InMemoryAuthRepository, account: &Account) -> Account {
        repo.find_by_id(&account.account_id).await.unwrap().unwrap()
    }

    pub fn app(repo: &InMemoryAuthRepository, config: AuthConfig) -> Router {
        auth_router_generic(repo.clone(), config)
    }

    pub fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
        let body = serde_json::json!({ "username": username, "password": password });
        send(app, request(Method::POST, "/api/auth/login", None, Some(body))).await
    }
}

// ============================================================================
// Login
// ============================================================================

#[cfg(test)]
mod login_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use chrono::Utc;

    use super::support::*;
    use crate::application::config::LockoutConfig;
    use crate::application::{
        AuthFailureReason, LoginInput, LoginUseCase, VerifyCredentialsUseCase, VerifyOutcome,
    };
    use crate::domain::entity::account_change::AccountChange;
    use crate::domain::value_object::user_password::RawPassword;
    use crate::error::AuthError;
    use crate::infra::memory::InMemoryAuthRepository;

    #[tokio::test]
    async fn active_account_logs_in_with_its_roles() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        let manager = seed_role(&repo, "MANAGER").await;
        let alice = seed_account(&repo, "alice", vec![user, manager], true).await;
        change(&repo, &alice, AccountChange::FailedAttempt).await;
        change(&repo, &alice, AccountChange::FailedAttempt).await;

        let config = config();
        let app = app(&repo, config.clone());
        let (status, body) = login(&app, "alice", PASSWORD).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["emailVerified"], true);
        assert_eq!(body["enabled"], true);
        assert!(body.get("passwordHash").is_none());

        let token = body["token"].as_str().unwrap();
        let claims = tokens(&config).parse_and_validate(token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, role_set(&["MANAGER", "USER"]));

        let stored = reload(&repo, &alice).await;
        assert_eq!(stored.failed_attempts, 0);
        assert!(stored.last_login.is_some());
        assert_eq!(body["lastLogin"], serde_json::to_value(stored.last_login).unwrap());
    }

    #[tokio::test]
    async fn disabled_account_fails_generically_and_counts() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        let bob = seed_account(&repo, "bob", vec![user], true).await;
        change(&repo, &bob, AccountChange::SetEnabled(false)).await;

        let app = app(&repo, config());
        let (status, body) = login(&app, "bob", PASSWORD).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid credentials");
        assert_eq!(reload(&repo, &bob).await.failed_attempts, 1);
    }

    #[tokio::test]
    async fn wrong_password_increments_by_exactly_one() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        let carol = seed_account(&repo, "carol", vec![user], true).await;
        let app = app(&repo, config());

        for expected in 1..=3 {
            let (status, _) = login(&app, "carol", "Wrong123!").await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(reload(&repo, &carol).await.failed_attempts, expected);
        }
    }

    #[tokio::test]
    async fn failure_responses_do_not_reveal_the_reason() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        seed_account(&repo, "dave", vec![user.clone()], true).await;
        seed_account(&repo, "erin", vec![user], false).await;
        let app = app(&repo, config());

        let (_, bad_password) = login(&app, "dave", "Wrong123!").await;
        let (_, unknown) = login(&app, "nobody", PASSWORD).await;
        let (_, unverified) = login(&app, "erin", PASSWORD).await;
        let (_, invalid_name) = login(&app, "a b", PASSWORD).await;

        assert_eq!(bad_password, unknown);
        assert_eq!(bad_password, unverified);
        assert_eq!(bad_password, invalid_name);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let repo = InMemoryAuthRepository::new();
        let app = app(&repo, config());

        let (status, _) = login(&app, "  ", PASSWORD).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = login(&app, "alice", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn locked_account_rejects_correct_password() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        let alice = seed_account(&repo, "alice", vec![user], true).await;
        let until = Utc::now() + chrono::Duration::hours(1);
        change(&repo, &alice, AccountChange::Lock(until)).await;

        let app = app(&repo, config());
        let (status, body) = login(&app, "alice", PASSWORD).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid credentials");
        assert_eq!(reload(&repo, &alice).await.failed_attempts, 1);
    }

    #[tokio::test]
    async fn expired_lock_no_longer_blocks() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let user = seed_role(&repo, "USER").await;
        let alice = seed_account(&repo, "alice", vec![user], true).await;
        let now = Utc::now();
        let until = now + chrono::Duration::minutes(10);
        change(&repo, &alice, AccountChange::Lock(until)).await;

        let config = Arc::new(config());
        let login = LoginUseCase::new(repo.clone(), config.clone(), Arc::new(tokens(&config)));
        let input = || LoginInput {
            username: "alice".to_string(),
            password: PASSWORD.to_string(),
        };

        assert!(matches!(
            login.execute_at(input(), now).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(login.execute_at(input(), until).await.is_ok());
    }

    #[tokio::test]
    async fn verifier_checks_in_order() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let user = seed_role(&repo, "USER").await;
        let frank = seed_account(&repo, "frank", vec![user], false).await;
        let now = Utc::now();
        change(&repo, &frank, AccountChange::SetEnabled(false)).await;
        change(&repo, &frank, AccountChange::Lock(now + chrono::Duration::hours(1))).await;

        let verifier = VerifyCredentialsUseCase::new(repo.clone(), Arc::new(config()));
        let attempt = || RawPassword::attempt("Wrong123!".to_string());

        let reason = |outcome: VerifyOutcome| match outcome {
            VerifyOutcome::Rejected { reason, .. } => Some(reason),
            VerifyOutcome::Verified(_) => None,
        };

        let outcome = verifier.execute("frank", attempt(), now).await.unwrap();
        assert_eq!(reason(outcome), Some(AuthFailureReason::Disabled));

        change(&repo, &frank, AccountChange::SetEnabled(true)).await;
        let outcome = verifier.execute("frank", attempt(), now).await.unwrap();
        assert_eq!(reason(outcome), Some(AuthFailureReason::EmailNotVerified));

        change(&repo, &frank, AccountChange::VerifyEmail).await;
        let outcome = verifier.execute("frank", attempt(), now).await.unwrap();
        assert_eq!(reason(outcome), Some(AuthFailureReason::Locked));

        change(&repo, &frank, AccountChange::Unlock).await;
        let outcome = verifier.execute("frank", attempt(), now).await.unwrap();
        assert_eq!(reason(outcome), Some(AuthFailureReason::BadPassword));

        let outcome = verifier.execute("ghost", attempt(), now).await.unwrap();
        assert!(matches!(
            outcome,
            VerifyOutcome::Rejected {
                reason: AuthFailureReason::NoSuchAccount,
                account: None
            }
        ));

        let outcome = verifier
            .execute("frank", RawPassword::attempt(PASSWORD.to_string()), now)
            .await
            .unwrap();
        assert!(matches!(outcome, VerifyOutcome::Verified(_)));
    }

    #[tokio::test]
    async fn no_automatic_lock_by_default() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        let grace = seed_account(&repo, "grace", vec![user], true).await;
        let app = app(&repo, config());

        for _ in 0..10 {
            login(&app, "grace", "Wrong123!").await;
        }

        let stored = reload(&repo, &grace).await;
        assert_eq!(stored.failed_attempts, 10);
        assert!(stored.locked_until.is_none());

        let (status, _) = login(&app, "grace", PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn configured_threshold_locks_automatically() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        let heidi = seed_account(&repo, "heidi", vec![user], true).await;

        let config = crate::AuthConfig {
            lockout: LockoutConfig {
                max_failed_attempts: Some(3),
                lock_duration: Duration::from_secs(600),
            },
            ..config()
        };
        let app = app(&repo, config);

        for _ in 0..2 {
            login(&app, "heidi", "Wrong123!").await;
        }
        assert!(reload(&repo, &heidi).await.locked_until.is_none());

        login(&app, "heidi", "Wrong123!").await;
        let stored = reload(&repo, &heidi).await;
        assert_eq!(stored.failed_attempts, 3);
        assert!(stored.is_locked(Utc::now()));

        let (status, _) = login(&app, "heidi", PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(reload(&repo, &heidi).await.failed_attempts, 4);
    }
}

// ============================================================================
// Lockout Writes
// ============================================================================

#[cfg(test)]
mod lockout_tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use tokio::task::JoinSet;

    use super::support::*;
    use crate::application::config::{AuthConfig, LockoutConfig};
    use crate::application::{LockoutPolicy, ManageAccountUseCase};
    use crate::domain::entity::account::Account;
    use crate::infra::memory::InMemoryAuthRepository;

    struct Fixture {
        repo: Arc<InMemoryAuthRepository>,
        lockout: Arc<LockoutPolicy<InMemoryAuthRepository>>,
        manage: ManageAccountUseCase<InMemoryAuthRepository>,
        alice: Account,
    }

    async fn fixture(config: AuthConfig) -> Fixture {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let user = seed_role(&repo, "USER").await;
        let alice = seed_account(&repo, "alice", vec![user], true).await;
        let config = Arc::new(config);

        Fixture {
            lockout: Arc::new(LockoutPolicy::new(repo.clone(), config.clone())),
            manage: ManageAccountUseCase::new(repo.clone(), config),
            repo,
            alice,
        }
    }

    fn auto_lock_after(attempts: u32) -> AuthConfig {
        AuthConfig {
            lockout: LockoutConfig {
                max_failed_attempts: Some(attempts),
                lock_duration: std::time::Duration::from_secs(600),
            },
            ..config()
        }
    }

    #[tokio::test]
    async fn failure_after_admin_lock_keeps_the_lock() {
        let f = fixture(config()).await;

        // Read by a login before the administrator acts.
        let mut in_flight = reload(&f.repo, &f.alice).await;
        let until = Utc::now() + Duration::hours(1);
        f.manage
            .lock(f.alice.account_id.into_uuid(), until, Some("incident"))
            .await
            .unwrap();

        f.lockout
            .record_failure(&mut in_flight, Utc::now())
            .await
            .unwrap();

        let stored = reload(&f.repo, &f.alice).await;
        assert_eq!(stored.locked_until, Some(until));
        assert_eq!(stored.failed_attempts, 1);
        assert_eq!(in_flight.locked_until, Some(until));
    }

    #[tokio::test]
    async fn failure_after_password_reset_keeps_the_new_password() {
        let f = fixture(config()).await;

        let mut in_flight = reload(&f.repo, &f.alice).await;
        f.manage
            .reset_password("alice", "N3w&Better".to_string())
            .await
            .unwrap();

        f.lockout
            .record_failure(&mut in_flight, Utc::now())
            .await
            .unwrap();

        let app = app(&f.repo, config());
        let (status, _) = login(&app, "alice", PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = login(&app, "alice", "N3w&Better").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn success_after_admin_disable_keeps_the_account_disabled() {
        let f = fixture(config()).await;

        let mut in_flight = reload(&f.repo, &f.alice).await;
        f.manage
            .set_enabled(f.alice.account_id.into_uuid(), false)
            .await
            .unwrap();

        f.lockout
            .record_success(&mut in_flight, Utc::now())
            .await
            .unwrap();

        let stored = reload(&f.repo, &f.alice).await;
        assert!(!stored.enabled);
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn automatic_lock_never_shortens_an_admin_lock() {
        let f = fixture(auto_lock_after(1)).await;

        let mut in_flight = reload(&f.repo, &f.alice).await;
        let until = Utc::now() + Duration::days(1);
        f.manage
            .lock(f.alice.account_id.into_uuid(), until, None)
            .await
            .unwrap();

        f.lockout
            .record_failure(&mut in_flight, Utc::now())
            .await
            .unwrap();

        assert_eq!(reload(&f.repo, &f.alice).await.locked_until, Some(until));
    }

    #[tokio::test]
    async fn concurrent_failures_are_all_counted() {
        let f = fixture(config()).await;
        let snapshot = reload(&f.repo, &f.alice).await;

        let mut tasks = JoinSet::new();
        for _ in 0..20 {
            let lockout = f.lockout.clone();
            let mut account = snapshot.clone();
            tasks.spawn(async move { lockout.record_failure(&mut account, Utc::now()).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        assert_eq!(reload(&f.repo, &f.alice).await.failed_attempts, 20);
    }

    #[tokio::test]
    async fn threshold_uses_the_stored_counter() {
        let f = fixture(auto_lock_after(3)).await;
        let snapshot = reload(&f.repo, &f.alice).await;

        // Three logins that all read the account while its counter was 0.
        for _ in 0..3 {
            let mut account = snapshot.clone();
            f.lockout
                .record_failure(&mut account, Utc::now())
                .await
                .unwrap();
        }

        let stored = reload(&f.repo, &f.alice).await;
        assert_eq!(stored.failed_attempts, 3);
        assert!(stored.is_locked(Utc::now()));
    }
}

// ============================================================================
// Request Gate
// ============================================================================

#[cfg(test)]
mod gate_tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use chrono::{Duration, Utc};

    use super::support::*;
    use crate::application::{AuthContext, AuthenticateRequestUseCase, TokenRejection};
    use crate::domain::entity::account_change::AccountChange;
    use crate::infra::memory::InMemoryAuthRepository;

    #[tokio::test]
    async fn valid_token_establishes_identity() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        seed_account(&repo, "alice", vec![user], true).await;

        let config = config();
        let token = tokens(&config).issue("alice", role_set(&["USER"])).unwrap();
        let app = app(&repo, config);

        let (status, body) = send(
            &app,
            request(Method::GET, "/api/auth/me", Some(token.as_str()), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["roleNames"], serde_json::json!(["USER"]));
    }

    #[tokio::test]
    async fn expired_token_is_treated_like_no_token() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        seed_account(&repo, "alice", vec![user], true).await;

        let config = config();
        let issued = Utc::now() - Duration::hours(2);
        let expired = tokens(&config)
            .issue_at("alice", role_set(&["USER"]), issued)
            .unwrap();
        let app = app(&repo, config);

        let without = send(&app, request(Method::GET, "/api/auth/me", None, None)).await;
        let with_expired = send(
            &app,
            request(Method::GET, "/api/auth/me", Some(expired.as_str()), None),
        )
        .await;

        assert_eq!(without.0, StatusCode::UNAUTHORIZED);
        assert_eq!(with_expired, without);
    }

    #[tokio::test]
    async fn tampered_and_foreign_tokens_are_unauthenticated() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        seed_account(&repo, "alice", vec![user], true).await;

        let config = config();
        let token = tokens(&config).issue("alice", role_set(&["USER"])).unwrap();
        let app = app(&repo, config);

        let mut parts: Vec<String> = token.split('.').map(str::to_owned).collect();
        // Claim an extra role without re-signing.
        let forged_payload = platform::crypto::to_base64(
            br#"{"sub":"alice","roles":["ADMIN","USER"],"iat":0,"exp":9999999999}"#,
        )
        .replace('+', "-")
        .replace('/', "_")
        .trim_end_matches('=')
        .to_string();
        parts[1] = forged_payload;
        let forged = parts.join(".");

        for bad in [forged.as_str(), "not-a-token", "a.b.c"] {
            let (status, _) = send(
                &app,
                request(Method::GET, "/api/auth/me", Some(bad), None),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn tampering_any_segment_is_malformed() {
        let config = config();
        let tokens = tokens(&config);
        let token = tokens.issue("alice", role_set(&["USER"])).unwrap();

        let dots: Vec<usize> = token.match_indices('.').map(|(i, _)| i).collect();
        // One position inside the payload, one inside the signature.
        for index in [dots[0] + 3, dots[1] + 3] {
            let mut bytes = token.clone().into_bytes();
            bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert!(matches!(
                tokens.parse_and_validate(&tampered),
                Err(crate::AuthError::TokenMalformed)
            ));
        }
    }

    #[tokio::test]
    async fn account_disabled_after_issuance_loses_access() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        let alice = seed_account(&repo, "alice", vec![user], true).await;

        let config = config();
        let token = tokens(&config).issue("alice", role_set(&["USER"])).unwrap();
        let app = app(&repo, config);

        change(&repo, &alice, AccountChange::SetEnabled(false)).await;

        let (status, _) = send(
            &app,
            request(Method::GET, "/api/auth/me", Some(token.as_str()), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn gate_records_why_a_token_was_rejected() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let user = seed_role(&repo, "USER").await;
        let alice = seed_account(&repo, "alice", vec![user], true).await;

        let config = config();
        let tokens = Arc::new(tokens(&config));
        let gate = AuthenticateRequestUseCase::new(repo.clone(), tokens.clone());
        let now = Utc::now();

        assert_eq!(gate.execute(None, now).await, AuthContext::Anonymous);
        assert_eq!(
            gate.execute(Some("garbage"), now).await,
            AuthContext::Rejected(TokenRejection::Malformed)
        );

        let token = tokens.issue_at("alice", role_set(&["USER"]), now).unwrap();
        let later = now + Duration::hours(2);
        assert_eq!(
            gate.execute(Some(token.as_str()), later).await,
            AuthContext::Rejected(TokenRejection::Expired)
        );

        let context = gate.execute(Some(token.as_str()), now).await;
        assert!(context.is_authenticated());

        change(&repo, &alice, AccountChange::Lock(now + Duration::minutes(5))).await;
        assert_eq!(
            gate.execute(Some(token.as_str()), now).await,
            AuthContext::Rejected(TokenRejection::AccountUnavailable)
        );

        let ghost = tokens.issue_at("ghost", role_set(&[]), now).unwrap();
        assert_eq!(
            gate.execute(Some(ghost.as_str()), now).await,
            AuthContext::Rejected(TokenRejection::AccountUnavailable)
        );
    }

    #[tokio::test]
    async fn roles_come_from_the_token() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let user = seed_role(&repo, "USER").await;
        seed_account(&repo, "alice", vec![user], true).await;

        let config = config();
        let tokens = Arc::new(tokens(&config));
        let gate = AuthenticateRequestUseCase::new(repo, tokens.clone());

        // Signed with a role the account no longer holds.
        let token = tokens
            .issue("alice", role_set(&["USER", "AUDITOR"]))
            .unwrap();
        let context = gate.execute(Some(token.as_str()), Utc::now()).await;
        assert_eq!(
            context.principal().map(|p| p.roles.clone()),
            Some(role_set(&["AUDITOR", "USER"]))
        );
    }

    #[tokio::test]
    async fn login_path_bypasses_the_gate() {
        let repo = InMemoryAuthRepository::new();
        let user = seed_role(&repo, "USER").await;
        seed_account(&repo, "alice", vec![user], true).await;
        let app = app(&repo, config());

        let body = serde_json::json!({ "username": "alice", "password": PASSWORD });
        let (status, _) = send(
            &app,
            request(Method::POST, "/api/auth/login", Some("garbage"), Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

// ============================================================================
// Account Administration
// ============================================================================

#[cfg(test)]
mod admin_tests {
    use axum::Router;
    use axum::http::{Method, StatusCode};
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::support::*;
    use crate::domain::entity::account::Account;
    use crate::domain::entity::role::{ADMIN_ROLE, Role};
    use crate::infra::memory::InMemoryAuthRepository;

    struct Fixture {
        repo: InMemoryAuthRepository,
        app: Router,
        admin_token: String,
        user_role: Role,
        alice: Account,
    }

    async fn fixture() -> Fixture {
        let repo = InMemoryAuthRepository::new();
        let admin_role = seed_role(&repo, ADMIN_ROLE).await;
        let user_role = seed_role(&repo, "USER").await;
        seed_account(&repo, "root", vec![admin_role], true).await;
        let alice = seed_account(&repo, "alice", vec![user_role.clone()], true).await;

        let config = config();
        let admin_token = tokens(&config)
            .issue("root", role_set(&[ADMIN_ROLE]))
            .unwrap();
        let app = app(&repo, config);

        Fixture {
            repo,
            app,
            admin_token,
            user_role,
            alice,
        }
    }

    fn account_path(account: &Account, action: &str) -> String {
        format!("/api/accounts/{}/{}", account.account_id, action)
    }

    #[tokio::test]
    async fn admin_routes_require_admin_role() {
        let f = fixture().await;
        let user_token = tokens(&config())
            .issue("alice", role_set(&["USER"]))
            .unwrap();

        let (status, _) = send(
            &f.app,
            request(Method::GET, "/api/accounts/locked", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &f.app,
            request(Method::GET, "/api/accounts/locked", Some(user_token.as_str()), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &f.app,
            request(Method::GET, "/api/accounts/locked", Some(f.admin_token.as_str()), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn create_account_then_activate_and_login() {
        let f = fixture().await;
        let body = json!({
            "username": "ivan",
            "password": "Str0ng!Pass",
            "roleIds": [f.user_role.role_id.as_uuid()],
        });

        let (status, created) = send(
            &f.app,
            request(Method::POST, "/api/accounts", Some(f.admin_token.as_str()), Some(body.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["enabled"], true);
        assert_eq!(created["emailVerified"], false);
        assert_eq!(created["failedAttempts"], 0);
        assert_eq!(created["roleNames"], json!(["USER"]));
        assert!(created.get("passwordHash").is_none());

        // Unverified accounts cannot log in yet.
        let (status, _) = login(&f.app, "ivan", "Str0ng!Pass").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let id = created["id"].as_str().unwrap();
        let (status, verified) = send(
            &f.app,
            request(
                Method::POST,
                &format!("/api/accounts/{}/verify-email", id),
                Some(f.admin_token.as_str()),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verified["emailVerified"], true);

        let (status, _) = login(&f.app, "ivan", "Str0ng!Pass").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &f.app,
            request(Method::POST, "/api/accounts", Some(f.admin_token.as_str()), Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn create_account_validates_input() {
        let f = fixture().await;
        let cases = [
            (
                json!({ "username": "judy", "password": "Str0ng!Pass", "roleIds": [uuid::Uuid::new_v4()] }),
                StatusCode::NOT_FOUND,
            ),
            (
                json!({ "username": "judy", "password": "Str0ng!Pass", "roleIds": [] }),
                StatusCode::BAD_REQUEST,
            ),
            (
                json!({ "username": "judy", "password": "weak", "roleIds": [f.user_role.role_id.as_uuid()] }),
                StatusCode::BAD_REQUEST,
            ),
            (
                json!({ "username": "j", "password": "Str0ng!Pass", "roleIds": [f.user_role.role_id.as_uuid()] }),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (body, expected) in cases {
            let (status, _) = send(
                &f.app,
                request(Method::POST, "/api/accounts", Some(f.admin_token.as_str()), Some(body)),
            )
            .await;
            assert_eq!(status, expected);
        }
    }

    #[tokio::test]
    async fn lock_then_login_fails_and_counts() {
        let f = fixture().await;
        let until = Utc::now() + Duration::hours(1);

        let (status, locked) = send(
            &f.app,
            request(
                Method::POST,
                &account_path(&f.alice, "lock"),
                Some(f.admin_token.as_str()),
                Some(json!({ "lockUntil": until, "reason": "suspicious activity" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(locked["lockedUntil"].is_string());

        let (status, body) = login(&f.app, "alice", PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid credentials");
        assert_eq!(reload(&f.repo, &f.alice).await.failed_attempts, 1);

        let (status, listed) = send(
            &f.app,
            request(Method::GET, "/api/accounts/locked", Some(f.admin_token.as_str()), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
        assert_eq!(listed[0]["username"], "alice");
    }

    #[tokio::test]
    async fn lock_in_the_past_is_rejected_and_changes_nothing() {
        let f = fixture().await;
        let past = Utc::now() - Duration::seconds(1);

        let (status, _) = send(
            &f.app,
            request(
                Method::POST,
                &account_path(&f.alice, "lock"),
                Some(f.admin_token.as_str()),
                Some(json!({ "lockUntil": past })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let stored = reload(&f.repo, &f.alice).await;
        assert!(stored.locked_until.is_none());
        assert_eq!(stored.updated_at, f.alice.updated_at);
    }

    #[tokio::test]
    async fn unlock_clears_lock_and_counter() {
        let f = fixture().await;
        let until = Utc::now() + Duration::hours(1);
        send(
            &f.app,
            request(
                Method::POST,
                &account_path(&f.alice, "lock"),
                Some(f.admin_token.as_str()),
                Some(json!({ "lockUntil": until })),
            ),
        )
        .await;
        login(&f.app, "alice", PASSWORD).await;

        let (status, body) = send(
            &f.app,
            request(
                Method::POST,
                &account_path(&f.alice, "unlock"),
                Some(f.admin_token.as_str()),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["failedAttempts"], 0);
        assert!(body["lockedUntil"].is_null());

        let (status, _) = login(&f.app, "alice", PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn disable_and_enable() {
        let f = fixture().await;

        let (status, _) = send(
            &f.app,
            request(
                Method::POST,
                &account_path(&f.alice, "disable"),
                Some(f.admin_token.as_str()),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = login(&f.app, "alice", PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        send(
            &f.app,
            request(
                Method::POST,
                &account_path(&f.alice, "enable"),
                Some(f.admin_token.as_str()),
                None,
            ),
        )
        .await;
        let (status, _) = login(&f.app, "alice", PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let f = fixture().await;
        let path = format!("/api/accounts/{}/unlock", uuid::Uuid::new_v4());

        let (status, _) = send(
            &f.app,
            request(Method::POST, &path, Some(f.admin_token.as_str()), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &f.app,
            request(
                Method::GET,
                "/api/accounts/by-username/nobody",
                Some(f.admin_token.as_str()),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_by_username_is_exact() {
        let f = fixture().await;

        let (status, body) = send(
            &f.app,
            request(
                Method::GET,
                "/api/accounts/by-username/alice",
                Some(f.admin_token.as_str()),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], f.alice.account_id.to_string());

        let (status, _) = send(
            &f.app,
            request(
                Method::GET,
                "/api/accounts/by-username/Alice",
                Some(f.admin_token.as_str()),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn password_reset_clears_lock_and_replaces_password() {
        let f = fixture().await;
        let until = Utc::now() + Duration::hours(1);
        send(
            &f.app,
            request(
                Method::POST,
                &account_path(&f.alice, "lock"),
                Some(f.admin_token.as_str()),
                Some(json!({ "lockUntil": until })),
            ),
        )
        .await;

        let (status, body) = send(
            &f.app,
            request(
                Method::POST,
                "/api/accounts/password-reset",
                Some(f.admin_token.as_str()),
                Some(json!({ "username": "alice", "newPassword": "N3w&Better" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["lockedUntil"].is_null());

        let (status, _) = login(&f.app, "alice", PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = login(&f.app, "alice", "N3w&Better").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn get_by_id() {
        let f = fixture().await;

        let (status, body) = send(
            &f.app,
            request(
                Method::GET,
                &format!("/api/accounts/{}", f.alice.account_id),
                Some(f.admin_token.as_str()),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["roleIds"], json!([f.user_role.role_id.as_uuid()]));

        let (status, _) = send(
            &f.app,
            request(
                Method::GET,
                &format!("/api/accounts/{}", uuid::Uuid::new_v4()),
                Some(f.admin_token.as_str()),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_is_paged_by_username() {
        let f = fixture().await;
        seed_account(&f.repo, "carol", vec![f.user_role.clone()], true).await;
        seed_account(&f.repo, "bob", vec![f.user_role.clone()], true).await;

        let page = |uri: &'static str| request(Method::GET, uri, Some(f.admin_token.as_str()), None);

        let (status, first) = send(&f.app, page("/api/accounts?page=0&size=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["totalElements"], 4);
        assert_eq!(first["totalPages"], 2);
        assert_eq!(first["page"], 0);
        assert_eq!(first["size"], 2);
        assert_eq!(first["content"][0]["username"], "alice");
        assert_eq!(first["content"][1]["username"], "bob");

        let (_, second) = send(&f.app, page("/api/accounts?page=1&size=2")).await;
        assert_eq!(second["content"][0]["username"], "carol");
        assert_eq!(second["content"][1]["username"], "root");

        let (_, defaults) = send(&f.app, page("/api/accounts")).await;
        assert_eq!(defaults["size"], 20);
        assert_eq!(defaults["content"].as_array().map(Vec::len), Some(4));

        let (_, past_end) = send(&f.app, page("/api/accounts?page=5&size=2")).await;
        assert_eq!(past_end["content"], json!([]));
        assert_eq!(past_end["totalElements"], 4);
    }

    #[tokio::test]
    async fn list_by_role() {
        let f = fixture().await;
        let manager = seed_role(&f.repo, "MANAGER").await;
        seed_account(&f.repo, "mallory", vec![manager, f.user_role.clone()], true).await;

        let (status, body) = send(
            &f.app,
            request(
                Method::GET,
                &format!("/api/accounts/by-role/{}", f.user_role.role_id),
                Some(f.admin_token.as_str()),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalElements"], 2);
        assert_eq!(body["content"][0]["username"], "alice");
        assert_eq!(body["content"][1]["username"], "mallory");

        let (status, _) = send(
            &f.app,
            request(
                Method::GET,
                &format!("/api/accounts/by-role/{}", uuid::Uuid::new_v4()),
                Some(f.admin_token.as_str()),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_replaces_roles_flags_and_password() {
        let f = fixture().await;
        let manager = seed_role(&f.repo, "MANAGER").await;
        let path = format!("/api/accounts/{}", f.alice.account_id);

        let (status, body) = send(
            &f.app,
            request(
                Method::PUT,
                &path,
                Some(f.admin_token.as_str()),
                Some(json!({
                    "username": "alice",
                    "password": "N3w&Better",
                    "roleIds": [manager.role_id.as_uuid()],
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["roleNames"], json!(["MANAGER"]));
        assert_eq!(body["enabled"], true);
        assert_eq!(body["emailVerified"], true);

        let (status, _) = login(&f.app, "alice", PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, logged_in) = login(&f.app, "alice", "N3w&Better").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(logged_in["roleNames"], json!(["MANAGER"]));

        // Blank password and empty roles leave both untouched.
        let (status, body) = send(
            &f.app,
            request(
                Method::PUT,
                &path,
                Some(f.admin_token.as_str()),
                Some(json!({
                    "password": "",
                    "roleIds": [],
                    "enabled": false,
                    "emailVerified": false,
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enabled"], false);
        assert_eq!(body["emailVerified"], false);
        assert_eq!(body["roleNames"], json!(["MANAGER"]));

        let stored = reload(&f.repo, &f.alice).await;
        assert!(!stored.enabled);
        assert_eq!(stored.role_names(), role_set(&["MANAGER"]));
    }

    #[tokio::test]
    async fn update_rejects_username_change_and_unknown_role() {
        let f = fixture().await;
        let path = format!("/api/accounts/{}", f.alice.account_id);

        let (status, body) = send(
            &f.app,
            request(
                Method::PUT,
                &path,
                Some(f.admin_token.as_str()),
                Some(json!({ "username": "alicia", "enabled": false })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("Username cannot be changed"));

        let (status, _) = send(
            &f.app,
            request(
                Method::PUT,
                &path,
                Some(f.admin_token.as_str()),
                Some(json!({ "roleIds": [uuid::Uuid::new_v4()], "enabled": false })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &f.app,
            request(
                Method::PUT,
                &path,
                Some(f.admin_token.as_str()),
                Some(json!({ "password": "weak" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let stored = reload(&f.repo, &f.alice).await;
        assert!(stored.enabled);
        assert_eq!(stored.role_names(), role_set(&["USER"]));
        assert_eq!(stored.updated_at, f.alice.updated_at);

        let (status, _) = send(
            &f.app,
            request(
                Method::PUT,
                &format!("/api/accounts/{}", uuid::Uuid::new_v4()),
                Some(f.admin_token.as_str()),
                Some(json!({ "enabled": false })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// Bootstrap
// ============================================================================

#[cfg(test)]
mod bootstrap_tests {
    use std::sync::Arc;

    use super::support::*;
    use crate::application::BootstrapAdminUseCase;
    use crate::domain::entity::role::ADMIN_ROLE;
    use crate::domain::repository::{AccountRepository, RoleRepository};
    use crate::domain::value_object::user_name::UserName;
    use crate::infra::memory::InMemoryAuthRepository;

    #[tokio::test]
    async fn seeds_admin_once() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let bootstrap = BootstrapAdminUseCase::new(repo.clone(), Arc::new(config()));

        assert!(bootstrap.execute("root", "Adm1n!Pass".to_string()).await.unwrap());
        assert!(!bootstrap.execute("root", "Adm1n!Pass".to_string()).await.unwrap());

        let root = repo
            .find_by_username(&UserName::new("root").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(root.email_verified);
        assert_eq!(root.role_names(), role_set(&[ADMIN_ROLE]));
        assert!(repo.find_role_by_name(ADMIN_ROLE).await.unwrap().is_some());
    }
}
