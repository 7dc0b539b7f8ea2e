//! User model as returned by the backend.

use serde::{Deserialize, Serialize};

/// Role id of administrators.
pub const ADMIN_ROLE_ID: i64 = 1;
/// Role id of regular users.
pub const USER_ROLE_ID: i64 = 2;

/// Snapshot of the authenticated user, fetched from `/users/me`.
///
/// Never mutated locally; profile changes require a re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user id
    pub id: i64,
    /// Email address
    pub email: String,
    /// Login name
    pub username: String,
    /// Display name
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
    /// Role id (1 = admin, 2 = user)
    #[serde(default, alias = "roleId")]
    pub role_id: Option<i64>,
    /// Whether the account is active
    #[serde(default = "default_active", alias = "isActive")]
    pub is_active: bool,
    /// Creation timestamp, as sent by the backend
    #[serde(alias = "createdAt")]
    pub created_at: String,
    /// Last update timestamp
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<String>,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Role derived from `role_id`.
    pub fn role(&self) -> Role {
        Role::from_id(self.role_id)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

/// User roles known to the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
    /// Missing or unrecognized role id.
    Unknown,
}

impl Role {
    pub fn from_id(role_id: Option<i64>) -> Self {
        match role_id {
            Some(ADMIN_ROLE_ID) => Role::Admin,
            Some(USER_ROLE_ID) => Role::User,
            _ => Role::Unknown,
        }
    }
}
