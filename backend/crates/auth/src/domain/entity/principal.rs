//! Principal
//!
//! The identity established for a request: who is calling and which roles
//! their token grants. Roles come from the token, so a role change only
//! takes effect once a new token is issued (at most one token TTL later).

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub username: String,
    pub roles: BTreeSet<String>,
}

impl Principal {
    pub fn new(username: impl Into<String>, roles: BTreeSet<String>) -> Self {
        Self {
            username: username.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// `Forbidden` unless the principal holds `role`
    pub fn require_role(&self, role: &str) -> AuthResult<()> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}
