//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Health check
//! GET  /health/ready           - Database reachability
//!
//! # Products
//! GET  /products               - Product listing (category, price, q, sort)
//! GET  /products/{id}          - Product detail
//!
//! # Cart
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (optional promo code)
//! POST /cart/update            - Set quantity (0 removes)
//! POST /cart/increment         - One more
//! POST /cart/decrement         - One less (removes at zero)
//! POST /cart/remove            - Remove line
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout (requires auth)
//! GET  /checkout               - Checkout form
//! POST /checkout               - Place order
//! GET  /checkout/complete/{id} - Order placed
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/provider          - Federated sign-in with a provider ID token
//! POST /auth/logout            - Logout action
//!
//! # Account (requires auth)
//! GET  /account                          - Account overview
//! POST /account/profile                  - Update name and phone
//! GET  /account/orders                   - Order history
//! GET  /account/orders/{id}              - Order detail
//! GET  /account/addresses                - Address book
//! POST /account/addresses                - Add address
//! GET  /account/addresses/{id}/edit      - Edit form
//! POST /account/addresses/{id}           - Save address
//! POST /account/addresses/{id}/delete    - Delete address
//! POST /account/addresses/{id}/default   - Make default
//!
//! # Preferences
//! POST /preferences/theme      - Light or dark
//!
//! # JSON
//! GET  /api/promo/validate         - Check a promo code for a product
//! POST /send-order-confirmation    - Email the customer (requires auth)
//! POST /send-admin-notification    - Email the shop (requires auth)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod preferences;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/provider", post(auth::provider))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/increment", post(cart::increment))
        .route("/decrement", post(cart::decrement))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place))
        .route("/complete/{id}", get(checkout::complete))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/profile", post(account::update_profile))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route(
            "/addresses",
            get(account::addresses).post(account::add_address),
        )
        .route("/addresses/{id}", post(account::update_address))
        .route("/addresses/{id}/edit", get(account::edit_address))
        .route("/addresses/{id}/delete", post(account::delete_address))
        .route("/addresses/{id}/default", post(account::set_default_address))
}

/// Create all page and API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/account", account_routes())
        .nest("/auth", auth_routes())
        .route("/preferences/theme", post(preferences::set_theme))
        .route("/api/promo/validate", get(api::promo::validate))
        .route(
            "/send-order-confirmation",
            post(api::notifications::send_order_confirmation),
        )
        .route(
            "/send-admin-notification",
            post(api::notifications::send_admin_notification),
        )
}
