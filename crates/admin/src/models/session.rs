//! Session-related types for admin authentication.

use serde::{Deserialize, Serialize};

use shopfront_core::{Email, UserId, UserRole};

/// Session-stored admin identity.
///
/// The role is re-read from the profile on every request; this copy only
/// drives the header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Identity service user id, also the profile key.
    pub uid: UserId,
    pub email: Email,
    pub name: String,
    pub role: UserRole,
}

/// Notice shown once on the next page, set after a form post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub is_error: bool,
    pub message: String,
}

impl Flash {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            is_error: false,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            message: message.into(),
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for the one-shot flash message.
    pub const FLASH: &str = "flash";
}
