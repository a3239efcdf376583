//! Types stored in the session.
//!
//! The session doubles as the browser-scoped store: it holds the guest cart,
//! the theme preference and one-shot notices alongside the signed-in user.

use serde::{Deserialize, Serialize};

use shopfront_core::{Email, UserId, UserRole};

/// Session-stored user identity.
///
/// Minimal data needed to render pages and authorize requests without a
/// database read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub uid: UserId,
    pub email: Email,
    pub name: String,
    pub role: UserRole,
}

impl CurrentUser {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.email.as_str()
        } else {
            &self.name
        }
    }
}

/// Colour scheme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Parse a form value; anything unknown falls back to light.
    #[must_use]
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim() {
            "dark" => Self::Dark,
            _ => Self::Light,
        }
    }
}

/// Severity of a one-shot notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// The signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// The working cart (guest cart, or the signed-in user's mirrored cart).
    pub const CART: &str = "cart";

    /// Colour scheme preference.
    pub const THEME: &str = "theme";

    /// Notice for the next page render.
    pub const NOTICE: &str = "notice";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parse() {
        assert_eq!(Theme::parse_or_default("dark"), Theme::Dark);
        assert_eq!(Theme::parse_or_default("neon"), Theme::Light);
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = CurrentUser {
            uid: UserId::new("u1"),
            email: Email::parse("ann@example.com").unwrap(),
            name: "  ".to_owned(),
            role: UserRole::Customer,
        };
        assert_eq!(user.display_name(), "ann@example.com");
        user.name = "Ann".to_owned();
        assert_eq!(user.display_name(), "Ann");
    }
}
