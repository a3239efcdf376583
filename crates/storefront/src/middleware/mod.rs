//! HTTP middleware and extractors for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded in the span and Sentry scope)
//! 4. Session layer (tower-sessions, in-memory store)

pub mod auth;
pub mod page;
pub mod request_id;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAuth, clear_current_user, safe_redirect, set_current_user, with_next,
};
pub use page::{Page, flash};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
