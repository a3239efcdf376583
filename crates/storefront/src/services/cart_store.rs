//! Where the working cart lives.
//!
//! The session holds the cart for every visitor. For signed-in users each
//! change is also written to `users/{uid}/cart`, so the cart follows them to
//! other devices and survives sign-out.

use tower_sessions::Session;

use shopfront_core::db::UserRepository;
use shopfront_core::models::Cart;

use crate::error::Result;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Current cart from the session (empty when none).
pub async fn load(session: &Session) -> Cart {
    match session.get::<Cart>(session_keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable cart in session, starting empty");
            Cart::new()
        }
    }
}

/// Store the cart in the session and, for signed-in users, the mirror.
///
/// # Errors
///
/// Returns an error if the session or the database write fails.
pub async fn save(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
    cart: &Cart,
) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    if let Some(user) = user {
        UserRepository::new(state.db())
            .save_cart(&user.uid, cart)
            .await?;
    }
    Ok(())
}

/// Merge the guest cart into the user's mirrored cart after sign-in and make
/// the result the working cart.
///
/// # Errors
///
/// Returns an error if the mirror cannot be read or written.
pub async fn adopt_on_sign_in(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
) -> Result<Cart> {
    let guest = load(session).await;
    let mut cart = UserRepository::new(state.db()).cart(&user.uid).await?;
    let guest_lines = guest.lines().count();
    cart.merge(guest);
    save(state, session, Some(user), &cart).await?;
    tracing::debug!(uid = %user.uid, guest_lines, items = cart.item_count(), "Cart restored after sign-in");
    Ok(cart)
}

/// Empty the working cart and the mirror after a successful checkout.
///
/// The order already exists at this point, so failures are logged rather
/// than returned. A stale mirror is replaced on the next cart change.
pub async fn clear(state: &AppState, session: &Session, user: Option<&CurrentUser>) {
    if let Err(e) = session.remove_value(session_keys::CART).await {
        tracing::warn!(error = %e, "Could not clear the session cart");
    }
    if let Some(user) = user {
        let empty = Cart::new();
        if let Err(e) = UserRepository::new(state.db()).save_cart(&user.uid, &empty).await {
            tracing::warn!(uid = %user.uid, error = %e, "Could not clear the saved cart");
        }
    }
}
