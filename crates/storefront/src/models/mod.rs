//! Storefront request-scoped models.

pub mod session;

pub use session::{CurrentUser, Notice, NoticeLevel, Theme, keys as session_keys};
