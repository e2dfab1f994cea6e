//! Role tags
//!
//! The backend reports roles as free-form strings (`"staff"`, `"STAFF"`,
//! `"ROLE_STAFF"`). They are parsed once at the system boundary; everything
//! past that point carries the typed variant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Manager,
    Customer,
}

impl Role {
    /// Every known role, in scope-key order
    pub const ALL: [Role; 4] = [Role::Admin, Role::Staff, Role::Manager, Role::Customer];

    /// Parse a raw backend role string.
    ///
    /// Accepts any casing and an optional `ROLE_` prefix. Returns `None` for
    /// anything outside the closed set.
    pub fn parse(raw: &str) -> Option<Role> {
        let normalized = raw.trim().to_ascii_uppercase();
        let name = normalized.strip_prefix("ROLE_").unwrap_or(&normalized);
        match name {
            "ADMIN" => Some(Role::Admin),
            "STAFF" => Some(Role::Staff),
            "MANAGER" => Some(Role::Manager),
            "CUSTOMER" => Some(Role::Customer),
            _ => None,
        }
    }

    /// Lowercase name, as used in storage keys and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Manager => "manager",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
