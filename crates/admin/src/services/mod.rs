//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Sign-in through the identity service, gated on the profile role
//! - `stats` - Dashboard figures computed from full scans

pub mod auth;
pub mod stats;

pub use auth::{AdminAuthError, AdminAuthService};
pub use stats::DashboardStats;
