//! Application Configuration
//!
//! Built once at startup and shared as `Arc<AuthConfig>`; never mutated
//! afterwards.

use std::fmt;
use std::time::Duration;

/// Minimum signing key length for HS256 (RFC 7518 §3.2)
pub const MIN_SECRET_LEN: usize = 32;

/// Automatic lockout after repeated failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutConfig {
    /// `None` keeps the counter without ever locking automatically
    pub max_failed_attempts: Option<u32>,
    /// How long an automatic lock lasts
    pub lock_duration: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: None,
            lock_duration: Duration::from_secs(15 * 60),
        }
    }
}

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 signing key for bearer tokens
    pub jwt_secret: Vec<u8>,
    /// Token lifetime (`exp = iat + token_ttl`)
    pub token_ttl: Duration,
    /// Path prefixes the request gate passes through untouched
    pub public_path_prefixes: Vec<String>,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    pub lockout: LockoutConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Vec::new(),
            token_ttl: Duration::from_secs(3600), // 1 hour
            public_path_prefixes: vec!["/api/auth/login".to_string()],
            password_pepper: None,
            lockout: LockoutConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Config with an explicit signing key
    pub fn with_secret(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: secret.into(),
            ..Default::default()
        }
    }

    /// Config with a random signing key (for development).
    ///
    /// Tokens do not survive a restart.
    pub fn development() -> Self {
        Self::with_secret(platform::crypto::random_bytes(MIN_SECRET_LEN))
    }

    /// Token TTL in whole seconds
    pub fn token_ttl_secs(&self) -> i64 {
        i64::try_from(self.token_ttl.as_secs()).unwrap_or(i64::MAX)
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    /// Whether `path` is exempt from the request gate.
    ///
    /// Prefixes match on segment boundaries: `/api/auth/login` covers
    /// `/api/auth/login` and `/api/auth/login/x`, not `/api/auth/loginx`.
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_path_prefixes.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            match path.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            }
        })
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("public_path_prefixes", &self.public_path_prefixes)
            .field("password_pepper", &self.password_pepper.as_ref().map(|_| "[REDACTED]"))
            .field("lockout", &self.lockout)
            .finish()
    }
}
