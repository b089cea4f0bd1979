//! Token Service
//!
//! Issues and validates HS256 bearer tokens (compact JWS). Validation is
//! purely cryptographic: no storage is consulted, so a token stays usable
//! until `exp` even if the account changes in the meantime.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::application::config::AuthConfig;
use crate::error::{AuthError, AuthResult};

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Username
    pub sub: String,
    /// Role names granted at issuance
    pub roles: BTreeSet<String>,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expires at (Unix seconds)
    pub exp: i64,
}

/// Signs and verifies bearer tokens with the configured secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock in `parse_and_validate_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iat", "exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(&config.jwt_secret),
            decoding_key: DecodingKey::from_secret(&config.jwt_secret),
            validation,
            ttl_secs: config.token_ttl_secs(),
        }
    }

    pub fn issue(&self, username: &str, roles: BTreeSet<String>) -> AuthResult<String> {
        self.issue_at(username, roles, Utc::now())
    }

    pub fn issue_at(
        &self,
        username: &str,
        roles: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> AuthResult<String> {
        let iat = now.timestamp();
        let claims = TokenClaims {
            sub: username.to_string(),
            roles,
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token creation failed: {}", e)))
    }

    pub fn parse_and_validate(&self, token: &str) -> AuthResult<TokenClaims> {
        self.parse_and_validate_at(token, Utc::now())
    }

    /// Verify the signature, then require `now < exp`.
    ///
    /// # Errors
    /// - `TokenMalformed`: bad signature, bad structure, missing or
    ///   mistyped claims
    /// - `TokenExpired`: signature valid but `now >= exp`
    pub fn parse_and_validate_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<TokenClaims> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AuthError::TokenMalformed
            })?;

        if now.timestamp() >= claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}
