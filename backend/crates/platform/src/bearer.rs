//! Bearer Token Extraction
//!
//! `Authorization: Bearer <token>` parsing (RFC 6750 §2.1).

use axum::http::{HeaderMap, header};

const SCHEME: &str = "Bearer";

/// Extract the bearer token from request headers.
///
/// Returns `None` when the header is absent, not valid ASCII, uses another
/// scheme, or carries an empty token. The scheme name is matched
/// case-insensitively.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return None;
    }

    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Build an `Authorization` header value for a token
pub fn bearer_header_value(token: &str) -> String {
    format!("{} {}", SCHEME, token)
}
