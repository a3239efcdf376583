//! Cart route handlers.
//!
//! Every mutation re-reads the cart from the session, applies one rule from
//! [`Cart`], and writes it back (plus the database mirror when signed in). A
//! rejected mutation leaves the cart untouched and shows a notice instead.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::db::{ProductRepository, PromoRepository};
use shopfront_core::models::{Cart, CartError, CartLine, promo};
use shopfront_core::{Money, Percent, ProductId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, Page, flash, safe_redirect};
use crate::models::{CurrentUser, Notice};
use crate::services::cart_store;
use crate::state::AppState;

/// Cart display data for templates.
#[derive(Clone, Default)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub subtotal: Money,
    pub savings: Money,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart.lines().cloned().collect(),
            subtotal: cart.subtotal(),
            savings: cart.savings(),
            item_count: cart.item_count(),
        }
    }
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub const fn has_savings(&self) -> bool {
        self.savings.units() > 0
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub redirect_to: Option<String>,
}

/// Set-quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: u32,
}

/// Single-line form data (increment, decrement, remove).
#[derive(Debug, Deserialize)]
pub struct LineForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: Page,
    pub cart: CartView,
}

/// Cart count badge fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

fn parse_product_id(raw: &str) -> Result<ProductId> {
    ProductId::parse(raw.trim()).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Load, change, and store the cart. Cart rule violations become a notice.
async fn apply<F>(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
    change: F,
) -> Result<Redirect>
where
    F: FnOnce(&mut Cart) -> std::result::Result<(), CartError>,
{
    let mut cart = cart_store::load(session).await;
    match change(&mut cart) {
        Ok(()) => cart_store::save(state, session, user, &cart).await?,
        Err(e) => {
            tracing::debug!(error = %e, "Cart change rejected");
            flash(session, Notice::warning(e.to_string())).await;
        }
    }
    Ok(Redirect::to("/cart"))
}

/// Display cart page.
#[instrument(skip_all)]
pub async fn show(session: Session, page: Page) -> impl IntoResponse {
    let cart = cart_store::load(&session).await;
    CartShowTemplate {
        page,
        cart: CartView::from(&cart),
    }
}

/// Notice after an add. `unused_code` is a promo code that could not change
/// the price of a line already in the cart.
fn added_notice(name: &str, unused_code: Option<&str>) -> Notice {
    match unused_code {
        None => Notice::success(format!("Added {name} to your cart")),
        Some(code) => Notice::info(format!(
            "Added {name} to your cart at its earlier price. \
             {code} only applies when a product is first added"
        )),
    }
}

/// Add a product to the cart.
///
/// Reads the live product so the stock ceiling is current. A promo code, when
/// given and valid for the product, replaces the product discount if larger.
/// Lines already in the cart keep their price, so the customer is told when
/// a code went unused.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    let product_id = parse_product_id(&form.product_id)?;
    let back = safe_redirect(form.redirect_to.as_deref(), "/cart");

    let Some(product) = ProductRepository::new(state.db()).get(&product_id).await? else {
        flash(&session, Notice::warning("That product is no longer available")).await;
        return Ok(Redirect::to(&back));
    };

    let mut discount = product.discount;
    let code = form.promo_code.as_deref().map(str::trim).filter(|c| !c.is_empty());
    if let Some(code) = code {
        match promo_discount(&state, code, &product_id).await? {
            Ok(percent) => discount = discount.max(percent),
            Err(e) => {
                flash(&session, Notice::warning(format!("{code}: {e}"))).await;
                return Ok(Redirect::to(&back));
            }
        }
    }

    let mut cart = cart_store::load(&session).await;
    let unused_code = code.filter(|_| cart.line(&product_id).is_some());
    let quantity = form.quantity.unwrap_or(1);
    match cart.add(&product, discount, quantity) {
        Ok(line) => {
            let notice = added_notice(&line.name, unused_code);
            cart_store::save(&state, &session, user.as_ref(), &cart).await?;
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
            flash(&session, notice).await;
        }
        Err(e) => flash(&session, Notice::warning(e.to_string())).await,
    }

    Ok(Redirect::to(&back))
}

/// Look up and validate a promo code for one product.
///
/// The outer error is a store failure; the inner one is why the code was
/// rejected.
pub(crate) async fn promo_discount(
    state: &AppState,
    code: &str,
    product_id: &ProductId,
) -> Result<std::result::Result<Percent, promo::PromoError>> {
    let found = PromoRepository::new(state.db()).find(code).await?;
    Ok(promo::validate(found.as_ref(), product_id, Utc::now().date_naive()))
}

/// Set a line's quantity (0 removes it).
#[instrument(skip(state, session, user))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect> {
    let product_id = parse_product_id(&form.product_id)?;
    apply(&state, &session, user.as_ref(), |cart| {
        cart.set_quantity(&product_id, form.quantity)
    })
    .await
}

/// Add one to a line.
#[instrument(skip(state, session, user))]
pub async fn increment(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<LineForm>,
) -> Result<Redirect> {
    let product_id = parse_product_id(&form.product_id)?;
    apply(&state, &session, user.as_ref(), |cart| {
        cart.increment(&product_id).map(|_| ())
    })
    .await
}

/// Take one off a line; the line goes away at zero.
#[instrument(skip(state, session, user))]
pub async fn decrement(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<LineForm>,
) -> Result<Redirect> {
    let product_id = parse_product_id(&form.product_id)?;
    apply(&state, &session, user.as_ref(), |cart| {
        cart.decrement(&product_id).map(|_| ())
    })
    .await
}

/// Remove a line.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<LineForm>,
) -> Result<Redirect> {
    let product_id = parse_product_id(&form.product_id)?;
    apply(&state, &session, user.as_ref(), |cart| {
        cart.remove(&product_id).map(|_| ())
    })
    .await
}

/// Cart count badge.
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: cart_store::load(&session).await.item_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoticeLevel;

    #[test]
    fn test_added_notice_mentions_unused_code() {
        let plain = added_notice("Pan", None);
        assert_eq!(plain.level, NoticeLevel::Success);
        assert_eq!(plain.message, "Added Pan to your cart");

        let unused = added_notice("Pan", Some("SUMMER10"));
        assert_eq!(unused.level, NoticeLevel::Info);
        assert!(unused.message.contains("earlier price"));
        assert!(unused.message.contains("SUMMER10"));
    }
}
