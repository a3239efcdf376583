//! User profiles stored next to the identity service account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{UserId, UserRole};

/// A profile as stored under `users/{uid}`.
///
/// The nested `addresses` and `cart` subtrees are read through their own
/// repositories and are not part of this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "UserId::is_empty")]
    pub uid: UserId,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// A fresh customer profile.
    #[must_use]
    pub fn customer(uid: UserId, name: String, email: String, created_at: DateTime<Utc>) -> Self {
        Self {
            uid,
            name,
            email,
            phone: String::new(),
            role: UserRole::Customer,
            created_at,
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.can_access_admin()
    }

    /// Name to greet the user with, falling back to the email's local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.email.split('@').next().unwrap_or(&self.email)
        } else {
            &self.name
        }
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(default)]
    pub phone: String,
}
