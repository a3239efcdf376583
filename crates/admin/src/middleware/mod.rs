//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (SameSite=Strict, 24h)
//!
//! Authorization is an extractor, [`RequireAdminAuth`], so every protected
//! handler names it in its signature.

pub mod auth;
pub mod session;

pub use auth::{
    OptionalAdminAuth, RequireAdminAuth, clear_current_admin, flash, set_current_admin, take_flash,
};
pub use session::create_session_layer;
