//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Health check
//!
//! # Dashboard
//! GET  /                           - Dashboard overview
//!
//! # Auth (email and password; profile role must be admin)
//! GET  /auth/login                 - Login page
//! POST /auth/login                 - Login action
//! POST /auth/logout                - Logout
//!
//! # Products
//! GET  /products                   - Product listing
//! GET  /products/new               - New product form
//! POST /products                   - Create product
//! GET  /products/{id}/edit         - Edit form
//! POST /products/{id}              - Save product
//! POST /products/{id}/delete       - Delete product
//!
//! # Orders
//! GET  /orders                     - Order listing (?status=)
//! GET  /orders/{id}                - Order detail
//! POST /orders/{id}/status         - Change status
//! POST /orders/{id}/delete         - Delete order
//!
//! # Users
//! GET  /users                      - Profile listing
//! POST /users/{uid}/role           - Change role
//! POST /users/{uid}/delete         - Delete profile record
//!
//! # Promo codes
//! GET  /promos                     - Code listing and create form
//! POST /promos                     - Create code
//! POST /promos/{code}/toggle       - Activate or deactivate
//! POST /promos/{code}/delete       - Delete code
//! ```

pub mod auth;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod promos;
pub mod users;

use askama::Template;
use axum::{Router, response::Html};

use crate::state::AppState;

pub use dashboard::AdminUserView;

/// Create all page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(dashboard::router())
        .merge(auth::router())
        .nest("/products", products::router())
        .nest("/orders", orders::router())
        .nest("/users", users::router())
        .nest("/promos", promos::router())
}

/// Render a template, logging failures instead of leaking them.
pub(crate) fn render(template: &impl Template) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}
