//! Role Entity
//!
//! A named bundle of permissions. Read-only from the auth core's point of
//! view; only the bootstrap path creates roles.

use std::collections::BTreeSet;

use kernel::id::RoleId;

/// Role name that grants access to account administration
pub const ADMIN_ROLE: &str = "ADMIN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub role_id: RoleId,
    /// Unique across roles; this is what tokens carry
    pub name: String,
    pub description: Option<String>,
    pub permissions: BTreeSet<String>,
}

impl Role {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        permissions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            role_id: RoleId::new(),
            name: name.into(),
            description,
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}
