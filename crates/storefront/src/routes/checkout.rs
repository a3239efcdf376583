//! Checkout route handlers.
//!
//! The form collects contact details, a delivery address (saved or new) and a
//! payment method, then hands the session cart to the
//! [`CheckoutSequencer`]. Stock problems send the customer back to the cart
//! with a notice; the cart is only cleared once the order exists.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::checkout::{CheckoutError, CheckoutRequest, CheckoutSequencer};
use shopfront_core::db::{OrderRepository, UserRepository};
use shopfront_core::models::{AddressBook, CustomerContact, Order, PostalAddress};
use shopfront_core::{AddressId, OrderId, PaymentMethod};

use super::cart::CartView;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Page, RequireAuth, flash};
use crate::models::{CurrentUser, Notice};
use crate::services::cart_store;
use crate::state::AppState;

/// A saved address offered on the checkout form.
#[derive(Clone)]
pub struct AddressOption {
    pub id: String,
    pub summary: String,
    pub is_default: bool,
}

/// A payment method offered on the checkout form.
#[derive(Clone)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn address_options(book: &AddressBook) -> Vec<AddressOption> {
    book.iter()
        .map(|(id, saved)| AddressOption {
            id: id.to_string(),
            summary: format!("{}, {}", saved.address.full_name, saved.address.one_line()),
            is_default: saved.is_default,
        })
        .collect()
}

fn payment_options(selected: PaymentMethod) -> Vec<PaymentOption> {
    PaymentMethod::ALL
        .iter()
        .map(|method| PaymentOption {
            value: method.as_str(),
            label: method.label(),
            selected: *method == selected,
        })
        .collect()
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub page: Page,
    pub cart: CartView,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub addresses: Vec<AddressOption>,
    pub can_save_address: bool,
    pub payment_methods: Vec<PaymentOption>,
}

/// Order placed template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/complete.html")]
pub struct CheckoutCompleteTemplate {
    pub page: Page,
    pub order: Order,
}

/// Checkout form data.
///
/// `address_id` selects a saved address; when it is empty the inline address
/// fields are used.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address_id: String,
    pub full_name: String,
    pub address_phone: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub save_address: Option<String>,
    pub payment_method: String,
}

impl CheckoutForm {
    fn inline_address(&self) -> PostalAddress {
        PostalAddress {
            full_name: self.full_name.clone(),
            phone: self.address_phone.clone(),
            line1: self.line1.clone(),
            line2: self.line2.clone(),
            city: self.city.clone(),
            region: self.region.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
        }
    }

    fn contact(&self, user: &CurrentUser) -> CustomerContact {
        let name = self.name.trim();
        let email = self.email.trim();
        CustomerContact {
            name: if name.is_empty() {
                user.display_name().to_owned()
            } else {
                name.to_owned()
            },
            email: if email.is_empty() {
                user.email.to_string()
            } else {
                email.to_owned()
            },
            phone: self.phone.trim().to_owned(),
        }
    }
}

/// Display the checkout form.
#[instrument(skip_all, fields(uid = %user.uid))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let cart = cart_store::load(&session).await;
    if cart.is_empty() {
        flash(&session, Notice::info("Your cart is empty")).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let users = UserRepository::new(state.db());
    let profile = users.get(&user.uid).await?;
    let book = users.addresses(&user.uid).await?;

    let (name, phone) = profile.map_or_else(
        || (user.name.clone(), String::new()),
        |p| (p.name, p.phone),
    );

    Ok(CheckoutTemplate {
        page,
        cart: CartView::from(&cart),
        name,
        email: user.email.to_string(),
        phone,
        can_save_address: !book.is_full(),
        addresses: address_options(&book),
        payment_methods: payment_options(PaymentMethod::default()),
    }
    .into_response())
}

/// The address an order ships to.
struct Delivery {
    address: PostalAddress,
    /// A new address the customer asked to keep in their address book.
    remember: bool,
}

/// Resolve the delivery address from a saved entry or the inline fields.
async fn delivery_address(
    state: &AppState,
    user: &CurrentUser,
    form: &CheckoutForm,
) -> Result<std::result::Result<Delivery, String>> {
    let selected = form.address_id.trim();
    if !selected.is_empty() {
        let id = AddressId::parse(selected).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let book = UserRepository::new(state.db()).addresses(&user.uid).await?;
        return Ok(book
            .get(&id)
            .map(|saved| Delivery {
                address: saved.address.clone(),
                remember: false,
            })
            .ok_or_else(|| "That saved address no longer exists".to_owned()));
    }

    Ok(form
        .inline_address()
        .normalized()
        .map(|address| Delivery {
            address,
            remember: form.save_address.is_some(),
        })
        .map_err(|e| e.to_string()))
}

/// Add a checkout address to the address book once the order exists.
///
/// A full book or a failed write leaves the order untouched.
async fn remember_address(state: &AppState, user: &CurrentUser, address: PostalAddress) {
    let users = UserRepository::new(state.db());
    let saved = async {
        let mut book = users.addresses(&user.uid).await?;
        match book.add(AddressId::generate(), address, false) {
            Ok(()) => users.save_addresses(&user.uid, &book).await,
            Err(e) => {
                tracing::debug!(error = %e, "Address not saved at checkout");
                Ok(())
            }
        }
    };
    if let Err(e) = saved.await {
        tracing::warn!(uid = %user.uid, error = %e, "Could not save the checkout address");
    }
}

/// Place the order.
#[instrument(skip_all, fields(uid = %user.uid))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Redirect> {
    let cart = cart_store::load(&session).await;
    if cart.is_empty() {
        flash(&session, Notice::info("Your cart is empty")).await;
        return Ok(Redirect::to("/cart"));
    }

    let payment_method = match form.payment_method.parse::<PaymentMethod>() {
        Ok(method) => method,
        Err(_) if form.payment_method.trim().is_empty() => PaymentMethod::default(),
        Err(e) => return Err(AppError::BadRequest(e.to_string())),
    };

    let delivery = match delivery_address(&state, &user, &form).await? {
        Ok(delivery) => delivery,
        Err(message) => {
            flash(&session, Notice::warning(message)).await;
            return Ok(Redirect::to("/checkout"));
        }
    };

    let remember = delivery.remember.then(|| delivery.address.clone());
    let request = CheckoutRequest {
        user_id: user.uid.clone(),
        customer: form.contact(&user),
        address: delivery.address,
        payment_method,
    };

    match CheckoutSequencer::new(state.db())
        .place_order(&cart, request, Utc::now())
        .await
    {
        Ok(order) => {
            cart_store::clear(&state, &session, Some(&user)).await;
            if let Some(address) = remember {
                remember_address(&state, &user, address).await;
            }
            add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));
            tracing::info!(order_id = %order.id, total = order.total.units(), "Order placed");
            let target = format!("/checkout/complete/{}", order.id);
            state.notifier().dispatch(order);
            Ok(Redirect::to(&target))
        }
        Err(CheckoutError::Store(err)) => Err(AppError::Database(err)),
        Err(err) => {
            tracing::info!(error = %err, product = ?err.product(), "Checkout rejected");
            flash(&session, Notice::warning(err.to_string())).await;
            Ok(Redirect::to("/cart"))
        }
    }
}

/// Load an order the signed-in user owns. Other users' orders are reported
/// as missing.
pub(crate) async fn owned_order(state: &AppState, user: &CurrentUser, raw_id: &str) -> Result<Order> {
    let id = OrderId::parse(raw_id).map_err(|_| AppError::NotFound("order".to_owned()))?;
    match OrderRepository::new(state.db()).get(&id).await? {
        Some(order) if order.user_id == user.uid => Ok(order),
        _ => Err(AppError::NotFound("order".to_owned())),
    }
}

/// Order placed confirmation.
#[instrument(skip(state, page, user))]
pub async fn complete(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let order = owned_order(&state, &user, &id).await?;
    Ok(CheckoutCompleteTemplate { page, order })
}
