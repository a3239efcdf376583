//! Storefront services.
//!
//! - `catalog` - Cached product list for browse pages
//! - `cart_store` - Session cart with the per-user database mirror
//! - `mailer` - Transactional mail API client
//! - `notifications` - Order confirmation and admin alert emails

pub mod cart_store;
pub mod catalog;
pub mod mailer;
pub mod notifications;

pub use catalog::CatalogCache;
pub use mailer::{HttpMailer, MailError, MailTransport, OutgoingEmail, RecordingMailer};
pub use notifications::{Notifier, NotifyError};
