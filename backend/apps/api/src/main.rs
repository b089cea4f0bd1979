//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request errors render through
//! `auth::AuthError`.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use auth::application::BootstrapAdminUseCase;
use auth::config::MIN_SECRET_LEN;
use auth::domain::repository::{AccountRepository, RoleRepository};
use auth::{AuthConfig, InMemoryAuthRepository, LockoutConfig, PgAuthRepository};
use axum::{
    http,
    http::{Method, header},
};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = auth_config_from_env()?;
    tracing::info!(?config, "Auth configuration loaded");

    let app = match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;

            tracing::info!("Migrations completed");

            let repo = PgAuthRepository::new(pool);
            bootstrap_admin(&repo, &config).await?;
            auth::auth_router(repo, config)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, accounts are kept in memory only");
            let repo = InMemoryAuthRepository::new();
            bootstrap_admin(&repo, &config).await?;
            auth::auth_router_generic(repo, config)
        }
    };

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(cors_from_env());

    // Start server
    let addr: SocketAddr = env_parse("BIND_ADDR")?
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 31113)));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Build the auth configuration from the environment.
///
/// `JWT_SECRET` is mandatory in release builds; debug builds fall back to
/// a random key.
fn auth_config_from_env() -> anyhow::Result<AuthConfig> {
    let mut config = match env::var("JWT_SECRET") {
        Ok(secret_b64) => {
            let secret = platform::crypto::from_base64(&secret_b64)
                .context("JWT_SECRET must be base64")?;
            if secret.len() < MIN_SECRET_LEN {
                bail!("JWT_SECRET must decode to at least {MIN_SECRET_LEN} bytes");
            }
            AuthConfig::with_secret(secret)
        }
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("JWT_SECRET not set, using a random development key");
            AuthConfig::development()
        }
        Err(_) => bail!("JWT_SECRET must be set in production"),
    };

    if let Some(secs) = env_parse::<u64>("JWT_TTL_SECS")? {
        if secs == 0 {
            bail!("JWT_TTL_SECS must be positive");
        }
        config.token_ttl = Duration::from_secs(secs);
    }

    if let Ok(prefixes) = env::var("PUBLIC_PATH_PREFIXES") {
        config.public_path_prefixes = prefixes
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
    }

    if let Ok(pepper) = env::var("PASSWORD_PEPPER") {
        config.password_pepper = Some(pepper.into_bytes());
    }

    let defaults = LockoutConfig::default();
    config.lockout = LockoutConfig {
        max_failed_attempts: env_parse("LOCKOUT_MAX_FAILED_ATTEMPTS")?.filter(|n| *n > 0),
        lock_duration: env_parse("LOCKOUT_DURATION_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.lock_duration),
    };

    Ok(config)
}

/// Seed the first administrator when both bootstrap variables are present.
async fn bootstrap_admin<R>(repo: &R, config: &AuthConfig) -> anyhow::Result<()>
where
    R: AccountRepository + RoleRepository + Clone,
{
    let (Ok(username), Ok(password)) = (
        env::var("BOOTSTRAP_ADMIN_USERNAME"),
        env::var("BOOTSTRAP_ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };

    let use_case = BootstrapAdminUseCase::new(Arc::new(repo.clone()), Arc::new(config.clone()));
    let created = use_case
        .execute(&username, password)
        .await
        .context("bootstrap admin failed")?;
    if created {
        tracing::info!(username = %username, "Bootstrap admin created");
    }

    Ok(())
}

fn cors_from_env() -> CorsLayer {
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
}

/// Parse an optional environment variable
fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} is not valid")),
        Err(_) => Ok(None),
    }
}
